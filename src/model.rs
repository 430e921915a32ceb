// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/model.rs - 模型与推理后端
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

use std::{
  fmt,
  path::{Path, PathBuf},
  str::FromStr,
};

use image::RgbImage;
use thiserror::Error;

use crate::{config::ConfigError, geometry::BBox};

pub mod decode;
pub mod detector;
#[cfg(feature = "rknpu_engine")]
pub mod rknn;

pub use self::decode::{DecodeParams, decode, non_max_suppression};
pub use self::detector::{DetectError, Detector};
#[cfg(feature = "rknpu_engine")]
pub use self::rknn::{RknnEngine, RknnEngineBuilder, RknnEngineError};

/// 模型网络输入尺寸，160x128
pub const NETWORK_WIDTH: u32 = 160;
pub const NETWORK_HEIGHT: u32 = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("网络尺寸必须是 32 的正整数倍, 实际为 {width}x{height}")]
pub struct NetworkSizeError {
  pub width: u32,
  pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSize {
  width: u32,
  height: u32,
}

impl NetworkSize {
  pub fn new(width: u32, height: u32) -> Result<Self, NetworkSizeError> {
    let valid = |v: u32| v >= 32 && v % 32 == 0;
    if !valid(width) || !valid(height) {
      return Err(NetworkSizeError { width, height });
    }
    Ok(Self { width, height })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }
}

/// 可选的检测模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelKind {
  #[default]
  Standard,
  Lightweight,
}

impl ModelKind {
  pub const ALL: [ModelKind; 2] = [ModelKind::Standard, ModelKind::Lightweight];

  pub fn name(&self) -> &'static str {
    match self {
      ModelKind::Standard => "Standard",
      ModelKind::Lightweight => "Lightweight",
    }
  }

  fn file_stems(&self) -> (&'static str, &'static str) {
    match self {
      ModelKind::Standard => ("yolo-obj_best.weights", "yolo-obj.cfg"),
      ModelKind::Lightweight => ("tiny_yolo_3l_best.weights", "tiny_yolo_3l.cfg"),
    }
  }
}

impl fmt::Display for ModelKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ModelKind {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ModelKind::ALL
      .into_iter()
      .find(|kind| kind.name() == s)
      .ok_or_else(|| ConfigError::UnknownModel(s.to_string()))
  }
}

/// 已解析出文件路径的模型描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
  pub kind: ModelKind,
  pub weights: PathBuf,
  pub config: PathBuf,
  pub network: NetworkSize,
}

impl ModelSpec {
  pub fn name(&self) -> &'static str {
    self.kind.name()
  }
}

/// 模型目录：`<root>/<模型名>/<权重与配置文件>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
  root: PathBuf,
}

impl ModelCatalog {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn resolve(&self, kind: ModelKind) -> ModelSpec {
    let (weights, config) = kind.file_stems();
    let directory = self.root.join(kind.name());
    ModelSpec {
      kind,
      weights: directory.join(weights),
      config: directory.join(config),
      network: NetworkSize {
        width: NETWORK_WIDTH,
        height: NETWORK_HEIGHT,
      },
    }
  }
}

/// 单个输出层，每行为 `[cx, cy, w, h, objectness, class scores...]`，坐标归一化
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutput {
  data: Vec<f32>,
  row_len: usize,
}

impl LayerOutput {
  pub fn new(data: Vec<f32>, row_len: usize) -> Self {
    Self { data, row_len }
  }

  pub fn row_len(&self) -> usize {
    self.row_len
  }

  /// 每个预测单元一行，不足一行的尾部数据被忽略
  pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.row_len.max(1))
  }

  /// 依次读取 `count` 个输出张量。任一张量读取失败则整帧失败，不返回残缺的层
  pub fn read_all<D, E>(
    count: usize,
    row_len: usize,
    mut read: impl FnMut(usize) -> Result<D, E>,
  ) -> Result<Vec<LayerOutput>, E>
  where
    D: AsRef<[f32]>,
  {
    (0..count)
      .map(|idx| read(idx).map(|data| LayerOutput::new(data.as_ref().to_vec(), row_len)))
      .collect()
  }
}

/// 单个检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub bbox: BBox,
  pub class_id: u32,
  pub confidence: f32,
}

impl Detection {
  /// 修正到帧范围内的新检测
  pub fn clamped(&self, bounds_w: u32, bounds_h: u32) -> Detection {
    Detection {
      bbox: self.bbox.clamped(bounds_w, bounds_h),
      ..*self
    }
  }
}

/// 推理后端
///
/// 输入是已缩放到网络尺寸的 RGB 图像，输出为原始的逐层预测。
/// `load_model` 在同名模型已加载时不得重复加载。
pub trait InferenceEngine: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  fn load_model(&mut self, spec: &ModelSpec) -> Result<(), Self::Error>;
  fn active_model(&self) -> Option<ModelKind>;
  fn set_gpu(&mut self, use_gpu: bool) -> Result<(), Self::Error>;
  fn forward(&mut self, input: &RgbImage) -> Result<Vec<LayerOutput>, Self::Error>;
}
