// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/input/csv_file.rs - 从 CSV 文件回放辐射帧
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FrameError, RawFrame},
  input::FrameSource,
};

#[derive(Error, Debug)]
pub enum CsvFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("line {line}: cannot parse '{value}' as a number")]
  ParseError { line: usize, value: String },
  #[error("line {line}: expected {expected} columns, found {found}")]
  RaggedRow {
    line: usize,
    expected: usize,
    found: usize,
  },
  #[error("frame error: {0}")]
  FrameError(#[from] FrameError),
}

/// 逗号分隔的辐射计数文件，每行一行像素。
///
/// 每次采集重新读取文件，文件消失即视为设备断开。
pub struct CsvFileInput {
  path: PathBuf,
}

impl FromUrlWithScheme for CsvFileInput {
  const SCHEME: &'static str = "csv";
}

impl FromUrl for CsvFileInput {
  type Error = CsvFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(CsvFileInputError::SchemaMismatch);
    }

    Ok(CsvFileInput::new(url.path()))
  }
}

impl CsvFileInput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

/// 解析 CSV 文本为辐射帧，空行被忽略
pub fn parse_csv_frame(text: &str) -> Result<RawFrame, CsvFileInputError> {
  let mut data = Vec::new();
  let mut width = None;
  let mut height = 0u32;

  for (idx, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let mut columns = 0;
    for value in line.split(',') {
      let value = value.trim();
      let parsed = value
        .parse::<f32>()
        .map_err(|_| CsvFileInputError::ParseError {
          line: idx + 1,
          value: value.to_string(),
        })?;
      data.push(parsed);
      columns += 1;
    }

    match width {
      None => width = Some(columns),
      Some(expected) if expected != columns => {
        return Err(CsvFileInputError::RaggedRow {
          line: idx + 1,
          expected,
          found: columns,
        });
      }
      Some(_) => {}
    }
    height += 1;
  }

  let width = width.unwrap_or(0) as u32;
  Ok(RawFrame::new(width, height, data)?)
}

impl FrameSource for CsvFileInput {
  type Error = CsvFileInputError;

  fn capture(&mut self) -> Result<RawFrame, Self::Error> {
    let text = std::fs::read_to_string(&self.path)?;
    let frame = parse_csv_frame(&text)?;
    debug!(
      "从 {} 读取 {}x{} 辐射帧",
      self.path.display(),
      frame.width(),
      frame.height()
    );
    Ok(frame)
  }

  fn is_connected(&self) -> bool {
    self.path.is_file()
  }
}
