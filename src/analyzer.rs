// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/analyzer.rs - 单帧分析：采集、检测、测温、绘制
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
use tracing::{debug, error, info};

use crate::{
  config::{ConfigError, Configuration},
  frame::{ColorFrame, RawFrame},
  input::FrameSource,
  model::{DetectError, Detection, Detector, InferenceEngine, ModelCatalog},
  output::draw::{BoxStyle, Compositor},
  palette::Palette,
  region::{self, RegionError},
  temperature::Temperature,
};

/// 人脸缩略图在每个方向上的扩展比例
pub const THUMBNAIL_ZOOM: f64 = 0.6;

#[derive(Error, Debug)]
pub enum MonitorError {
  #[error("热像仪连接已断开: {0}")]
  DeviceDisconnected(String),
  #[error(transparent)]
  Capture(Box<dyn std::error::Error + Send + Sync>),
  #[error(transparent)]
  Detect(#[from] DetectError),
  #[error(transparent)]
  Region(#[from] RegionError),
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error("无法启动监测线程: {0}")]
  Spawn(#[from] std::io::Error),
}

/// 单帧分析所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
  AwaitingCapture,
  Captured,
  Decoded,
  GeometryCorrected,
  PerFaceExtracted,
  Composited,
  Done,
  Faulted,
}

/// 一张人脸的测温结果
#[derive(Debug, Clone)]
pub struct Face {
  /// 已修正到帧内的检测
  pub detection: Detection,
  pub temperature: Temperature,
  /// 取自显示帧、向外扩展后的缩略图
  pub thumbnail: ColorFrame,
  pub over_threshold: bool,
}

#[derive(Debug, Clone)]
pub struct AnalyzedFrame {
  pub image: ColorFrame,
  pub faces: Vec<Face>,
}

/// 逐帧分析器，帧与帧之间不保留状态
pub struct FrameAnalyzer<S, E> {
  source: S,
  detector: Detector<E>,
  compositor: Compositor,
  config: Configuration,
  stage: FrameStage,
}

impl<S: FrameSource, E: InferenceEngine> FrameAnalyzer<S, E> {
  pub fn new(
    source: S,
    engine: E,
    catalog: ModelCatalog,
    compositor: Compositor,
    config: Configuration,
  ) -> Result<Self, MonitorError> {
    config.validate()?;
    let mut detector = Detector::new(engine, catalog);
    detector.set_gpu(config.use_gpu)?;
    detector.load_model(config.model)?;

    Ok(Self {
      source,
      detector,
      compositor,
      config,
      stage: FrameStage::AwaitingCapture,
    })
  }

  pub fn configuration(&self) -> &Configuration {
    &self.config
  }

  pub fn stage(&self) -> FrameStage {
    self.stage
  }

  pub fn detector(&self) -> &Detector<E> {
    &self.detector
  }

  /// 替换配置；模型或设备变化时重新加载
  pub fn apply_configuration(&mut self, config: Configuration) -> Result<(), MonitorError> {
    config.validate()?;
    self.detector.set_gpu(config.use_gpu)?;
    self.detector.load_model(config.model)?;
    info!(
      "应用配置: 阈值 {} {}, 调色板 {}, 模型 {}",
      config.temp_threshold, config.temp_unit, config.palette_index, config.model
    );
    self.config = config;
    Ok(())
  }

  /// 分析一帧；任何错误都使本帧进入 `Faulted`
  pub fn analyze(&mut self) -> Result<AnalyzedFrame, MonitorError> {
    let result = self.run_stages();
    if let Err(e) = &result {
      error!("帧分析失败 ({:?}): {}", self.stage, e);
      self.stage = FrameStage::Faulted;
    }
    result
  }

  fn run_stages(&mut self) -> Result<AnalyzedFrame, MonitorError> {
    self.stage = FrameStage::AwaitingCapture;
    let raw = self.capture()?;
    self.stage = FrameStage::Captured;

    // 检测输入固定使用参考调色板，与显示调色板无关
    let tensor = raw.to_color_image(Palette::REFERENCE);
    self.detector.load_image(tensor);
    let detections = self.detector.run(&self.config.decode_params())?;
    self.stage = FrameStage::Decoded;

    let (width, height) = (raw.width(), raw.height());
    let detections: Vec<Detection> = detections
      .iter()
      .map(|d| d.clamped(width, height))
      .filter(|d| {
        if d.bbox.is_degenerate() {
          debug!("丢弃帧外检测框 {:?}", d.bbox);
          return false;
        }
        true
      })
      .collect();
    self.stage = FrameStage::GeometryCorrected;

    let mut image = raw.to_color_image(self.config.palette()?);
    let faces = detections
      .into_iter()
      .map(|detection| self.measure(&raw, &image, detection))
      .collect::<Result<Vec<_>, _>>()?;
    self.stage = FrameStage::PerFaceExtracted;

    for face in &faces {
      let label = format!("{:.1}", face.temperature.value);
      self.compositor.composite(
        &mut image,
        &face.detection.bbox,
        BoxStyle::for_face(face.over_threshold),
        &label,
      );
    }
    self.stage = FrameStage::Composited;

    debug!("本帧检测到 {} 张人脸", faces.len());
    self.stage = FrameStage::Done;
    Ok(AnalyzedFrame { image, faces })
  }

  fn capture(&mut self) -> Result<RawFrame, MonitorError> {
    self.source.capture().map_err(|e| {
      if self.source.is_connected() {
        MonitorError::Capture(Box::new(e))
      } else {
        MonitorError::DeviceDisconnected(e.to_string())
      }
    })
  }

  fn measure(
    &self,
    raw: &RawFrame,
    display: &ColorFrame,
    detection: Detection,
  ) -> Result<Face, MonitorError> {
    let hot: RawFrame = region::extract(raw, &detection.bbox, 0.0, 0.0)?;
    let temperature = self.config.temp_unit.convert(f64::from(hot.max_value()));
    let thumbnail = region::extract(display, &detection.bbox, THUMBNAIL_ZOOM, THUMBNAIL_ZOOM)?;
    let over_threshold = temperature.value >= self.config.temp_threshold;
    debug!(
      "人脸 {:?}: {} (阈值 {}), 超标: {}",
      detection.bbox, temperature, self.config.temp_threshold, over_threshold
    );

    Ok(Face {
      detection,
      temperature,
      thumbnail,
      over_threshold,
    })
  }
}
