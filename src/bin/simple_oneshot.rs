// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧测温
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use tiwen::{
  FromUrl,
  analyzer::FrameAnalyzer,
  config::Configuration,
  input::InputWrapper,
  model::{ModelCatalog, RknnEngineBuilder},
  output::{OutputWrapper, draw::Compositor},
  task::{OneShotTask, Task},
};
use tracing::info;

/// 采集一帧并输出测温结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型根目录
  #[arg(long, value_name = "DIR")]
  pub model_dir: PathBuf,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 温度标签字体，缺省使用内置字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型目录: {}", args.model_dir.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let compositor = match &args.font {
    Some(path) => Compositor::from_font_file(path)?,
    None => Compositor::with_default_font()?,
  };
  let analyzer = FrameAnalyzer::new(
    InputWrapper::from_url(&args.input)?,
    RknnEngineBuilder::default().build(),
    ModelCatalog::new(&args.model_dir),
    compositor,
    Configuration::default(),
  )?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(analyzer, output)?;

  Ok(())
}
