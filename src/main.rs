// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/main.rs - 连续体温监测主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use tiwen::{
  FromUrl,
  analyzer::FrameAnalyzer,
  input::InputWrapper,
  model::{ModelCatalog, RknnEngineBuilder},
  output::OutputWrapper,
  palette::Palette,
  task::{ContinuousTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  if args.list_palettes {
    for palette in Palette::ALL {
      println!("{:>2}  {}", palette.index(), palette.name());
    }
    return Ok(());
  }

  let config = args.configuration();
  config.validate()?;

  info!("模型目录: {}", args.model_dir.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!(
    "告警阈值: {} {}, 调色板: {}",
    config.temp_threshold, config.temp_unit, config.palette_index
  );

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let engine = RknnEngineBuilder::default().classes(args.classes).build();
  let analyzer = FrameAnalyzer::new(
    input,
    engine,
    ModelCatalog::new(&args.model_dir),
    args.compositor()?,
    config,
  )?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .run_task(analyzer, output)?;

  Ok(())
}
