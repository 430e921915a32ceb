// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/input.rs - 辐射帧输入
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

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::RawFrame};

/// 辐射帧来源
///
/// `capture` 出错后由调用方通过 `is_connected` 区分“设备消失”与“采集抖动”。
pub trait FrameSource: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  fn capture(&mut self) -> Result<RawFrame, Self::Error>;
  fn is_connected(&self) -> bool;
}

mod csv_file;
mod lepton;

pub use self::csv_file::{CsvFileInput, CsvFileInputError};
pub use self::lepton::{LeptonInput, LeptonInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Lepton input error: {0}")]
  LeptonInputError(#[from] LeptonInputError),
  #[error("CSV file input error: {0}")]
  CsvFileInputError(#[from] CsvFileInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  Lepton(LeptonInput),
  CsvFile(CsvFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LeptonInput::SCHEME => Ok(InputWrapper::Lepton(LeptonInput::from_url(url)?)),
      CsvFileInput::SCHEME => Ok(InputWrapper::CsvFile(CsvFileInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl FrameSource for InputWrapper {
  type Error = InputError;

  fn capture(&mut self) -> Result<RawFrame, Self::Error> {
    match self {
      InputWrapper::Lepton(input) => input.capture().map_err(InputError::from),
      InputWrapper::CsvFile(input) => input.capture().map_err(InputError::from),
    }
  }

  fn is_connected(&self) -> bool {
    match self {
      InputWrapper::Lepton(input) => input.is_connected(),
      InputWrapper::CsvFile(input) => input.is_connected(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("rtsp://camera.local/stream").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}
