// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/output/console.rs - 以 JSON 行输出测温结果
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

use std::io::Write;

use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, analyzer::Face, controller::PipelineResult, output::Render,
};

/// 每帧向标准输出写一行 JSON
pub struct ConsoleOutput;

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 编码错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Ok(ConsoleOutput)
  }
}

fn face_record(face: &Face) -> Value {
  let bbox = face.detection.bbox;
  json!({
    "box": [bbox.x, bbox.y, bbox.w, bbox.h],
    "confidence": face.detection.confidence,
    "temperature": face.temperature.value,
    "unit": face.temperature.unit.name(),
    "over_threshold": face.over_threshold,
  })
}

/// 单帧结果的 JSON 表示，不含图像数据
pub fn frame_record(result: &PipelineResult) -> Value {
  json!({
    "fps": (result.fps * 10.0).round() / 10.0,
    "faces": result.faces.iter().map(face_record).collect::<Vec<_>>(),
  })
}

impl Render<PipelineResult> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, result: &PipelineResult) -> Result<(), Self::Error> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &frame_record(result))?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
  }
}
