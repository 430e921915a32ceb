// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

use tiwen::{
  config::Configuration,
  model::ModelKind,
  output::draw::{Compositor, FontError},
  temperature::TemperatureUnit,
};

/// Tiwen 体温监测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型根目录，其下为 Standard/ 与 Lightweight/
  #[arg(long, default_value = "yolo", value_name = "DIR")]
  pub model_dir: PathBuf,

  /// 检测模型: Standard 或 Lightweight
  #[arg(long, default_value = "Standard", value_name = "MODEL")]
  pub model: ModelKind,

  /// 输入来源
  /// - lepton:// 自动查找 PureThermal 设备
  /// - lepton:///dev/video2 指定设备
  /// - csv:///path/to/frame.csv 回放辐射帧
  #[arg(long, default_value = "lepton://", value_name = "SOURCE")]
  pub input: Url,

  /// 输出
  /// - image:///path/to/latest.png
  /// - console://
  #[arg(long, default_value = "console://", value_name = "OUTPUT")]
  pub output: Url,

  /// 发热告警阈值，单位与 --unit 一致
  #[arg(long, default_value_t = 38.0, value_name = "TEMP")]
  pub threshold: f64,

  /// 温度单位: Celsius、Fahrenheit 或 Kelvin
  #[arg(long, default_value = "Celsius", value_name = "UNIT")]
  pub unit: TemperatureUnit,

  /// 显示调色板索引
  #[arg(long, default_value_t = 5, value_name = "INDEX")]
  pub palette: usize,

  /// 列出可用调色板后退出
  #[arg(long)]
  pub list_palettes: bool,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.5, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)，缺省时与置信度阈值相同
  #[arg(long, value_name = "THRESHOLD")]
  pub nms_threshold: Option<f32>,

  /// 请求使用 GPU 推理
  #[arg(long)]
  pub gpu: bool,

  /// 温度标签字体（TTF/OTF），缺省使用内置字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 模型类别数
  #[arg(long, default_value_t = 1, value_name = "COUNT")]
  pub classes: usize,

  /// 处理指定帧数后退出
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

impl Args {
  pub fn configuration(&self) -> Configuration {
    Configuration::default()
      .with_temp_threshold(self.threshold)
      .with_temp_unit(self.unit)
      .with_palette_index(self.palette)
      .with_model(self.model)
      .with_confidence_threshold(self.confidence)
      .with_nms_threshold(self.nms_threshold)
      .with_gpu(self.gpu)
  }

  pub fn compositor(&self) -> Result<Compositor, FontError> {
    match &self.font {
      Some(path) => Compositor::from_font_file(path),
      None => Compositor::with_default_font(),
    }
  }
}
