// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/model/detector.rs - 人脸检测器
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

use std::time::Instant;

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{
  DecodeParams, Detection, InferenceEngine, ModelCatalog, ModelKind, ModelSpec, decode,
};

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("无法推理: 尚未加载图像")]
  NoImageLoaded,
  #[error("无法推理: 尚未加载模型")]
  NoModelLoaded,
  #[error("模型 {model} 加载失败: {source}")]
  ModelLoad {
    model: ModelKind,
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[error("推理后端错误: {0}")]
  Engine(Box<dyn std::error::Error + Send + Sync>),
}

/// 包装推理后端：管理当前模型、缩放输入并解码输出
pub struct Detector<E> {
  engine: E,
  catalog: ModelCatalog,
  spec: Option<ModelSpec>,
  image: Option<RgbImage>,
  use_gpu: Option<bool>,
}

impl<E: InferenceEngine> Detector<E> {
  pub fn new(engine: E, catalog: ModelCatalog) -> Self {
    Self {
      engine,
      catalog,
      spec: None,
      image: None,
      use_gpu: None,
    }
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn active_model(&self) -> Option<ModelKind> {
    self.spec.as_ref().map(|spec| spec.kind)
  }

  /// 加载模型；与当前模型相同时不做任何事
  pub fn load_model(&mut self, kind: ModelKind) -> Result<(), DetectError> {
    if self.active_model() == Some(kind) && self.engine.active_model() == Some(kind) {
      debug!("模型 {} 已加载, 跳过", kind);
      return Ok(());
    }

    let spec = self.catalog.resolve(kind);
    info!("加载模型 {}: {}", kind, spec.weights.display());
    self
      .engine
      .load_model(&spec)
      .map_err(|e| DetectError::ModelLoad {
        model: kind,
        source: Box::new(e),
      })?;
    self.spec = Some(spec);
    Ok(())
  }

  pub fn set_gpu(&mut self, use_gpu: bool) -> Result<(), DetectError> {
    if self.use_gpu == Some(use_gpu) {
      return Ok(());
    }
    info!("推理设备切换为 {}", if use_gpu { "GPU" } else { "CPU" });
    self
      .engine
      .set_gpu(use_gpu)
      .map_err(|e| DetectError::Engine(Box::new(e)))?;
    self.use_gpu = Some(use_gpu);
    Ok(())
  }

  /// 载入待检测的彩色图像
  pub fn load_image(&mut self, image: RgbImage) {
    self.image = Some(image);
  }

  /// 对已载入图像推理，检测框位于该图像的坐标系
  pub fn run(&mut self, params: &DecodeParams) -> Result<Vec<Detection>, DetectError> {
    let image = self.image.as_ref().ok_or(DetectError::NoImageLoaded)?;
    let spec = self.spec.as_ref().ok_or(DetectError::NoModelLoaded)?;
    let (width, height) = image.dimensions();

    let input = image::imageops::resize(
      image,
      spec.network.width(),
      spec.network.height(),
      FilterType::Triangle,
    );

    let now = Instant::now();
    let layers = self
      .engine
      .forward(&input)
      .map_err(|e| DetectError::Engine(Box::new(e)))?;
    debug!("推理完成, 耗时: {:.2?}, 输出层数: {}", now.elapsed(), layers.len());

    Ok(decode(&layers, width, height, params))
  }
}
