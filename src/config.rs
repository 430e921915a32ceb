// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/config.rs - 监测配置
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

use crate::{
  model::{ModelKind, decode::DecodeParams},
  palette::{Palette, PaletteError},
  temperature::TemperatureUnit,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("无法识别的温度单位 '{0}'")]
  UnknownUnit(String),
  #[error("无法识别的模型名称 '{0}'")]
  UnknownModel(String),
  #[error(transparent)]
  Palette(#[from] PaletteError),
  #[error("置信度阈值必须在 0 到 1 之间, 实际为 {0}")]
  ConfidenceOutOfRange(f32),
  #[error("NMS 阈值必须在 0 到 1 之间, 实际为 {0}")]
  NmsOutOfRange(f32),
  #[error("温度阈值必须是有限数值, 实际为 {0}")]
  NonFiniteThreshold(f64),
}

/// 监测配置，只在两帧之间整体替换
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
  /// 温度阈值，单位与 `temp_unit` 一致
  pub temp_threshold: f64,
  pub temp_unit: TemperatureUnit,
  /// 显示用调色板索引
  pub palette_index: usize,
  pub model: ModelKind,
  pub confidence_threshold: f32,
  /// NMS 重叠阈值，`None` 时沿用置信度阈值
  pub nms_threshold: Option<f32>,
  pub use_gpu: bool,
}

impl Default for Configuration {
  fn default() -> Self {
    Self {
      temp_threshold: 38.0,
      temp_unit: TemperatureUnit::Celsius,
      palette_index: Palette::REFERENCE.index(),
      model: ModelKind::Standard,
      confidence_threshold: 0.5,
      nms_threshold: None,
      use_gpu: false,
    }
  }
}

impl Configuration {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.temp_threshold.is_finite() {
      return Err(ConfigError::NonFiniteThreshold(self.temp_threshold));
    }
    Palette::from_index(self.palette_index)?;
    if !(0.0..=1.0).contains(&self.confidence_threshold) {
      return Err(ConfigError::ConfidenceOutOfRange(self.confidence_threshold));
    }
    if let Some(nms) = self.nms_threshold
      && !(0.0..=1.0).contains(&nms)
    {
      return Err(ConfigError::NmsOutOfRange(nms));
    }
    Ok(())
  }

  /// 显示用调色板
  pub fn palette(&self) -> Result<Palette, ConfigError> {
    Ok(Palette::from_index(self.palette_index)?)
  }

  pub fn decode_params(&self) -> DecodeParams {
    DecodeParams {
      score_threshold: self.confidence_threshold,
      nms_threshold: self.nms_threshold.unwrap_or(self.confidence_threshold),
    }
  }

  pub fn with_temp_threshold(mut self, threshold: f64) -> Self {
    self.temp_threshold = threshold;
    self
  }

  pub fn with_temp_unit(mut self, unit: TemperatureUnit) -> Self {
    self.temp_unit = unit;
    self
  }

  pub fn with_palette_index(mut self, index: usize) -> Self {
    self.palette_index = index;
    self
  }

  pub fn with_model(mut self, model: ModelKind) -> Self {
    self.model = model;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_nms_threshold(mut self, threshold: Option<f32>) -> Self {
    self.nms_threshold = threshold;
    self
  }

  pub fn with_gpu(mut self, use_gpu: bool) -> Self {
    self.use_gpu = use_gpu;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_is_valid() {
    let config = Configuration::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.palette().unwrap(), Palette::Ocean);
  }

  #[test]
  fn rejects_each_invalid_field() {
    let base = Configuration::default();
    assert_eq!(
      base.clone().with_temp_threshold(f64::NAN).validate().map_err(|e| e.to_string()),
      Err("温度阈值必须是有限数值, 实际为 NaN".to_string())
    );
    assert!(matches!(
      base.clone().with_palette_index(40).validate(),
      Err(ConfigError::Palette(PaletteError::OutOfRange { index: 40, .. }))
    ));
    assert_eq!(
      base.clone().with_confidence_threshold(1.5).validate(),
      Err(ConfigError::ConfidenceOutOfRange(1.5))
    );
    assert_eq!(
      base.with_nms_threshold(Some(-0.2)).validate(),
      Err(ConfigError::NmsOutOfRange(-0.2))
    );
  }

  #[test]
  fn nms_threshold_defaults_to_confidence() {
    let shared = Configuration::default().with_confidence_threshold(0.3);
    let params = shared.decode_params();
    assert_eq!(params.score_threshold, 0.3);
    assert_eq!(params.nms_threshold, 0.3);

    let split = shared.with_nms_threshold(Some(0.45)).decode_params();
    assert_eq!(split.score_threshold, 0.3);
    assert_eq!(split.nms_threshold, 0.45);
  }
}
