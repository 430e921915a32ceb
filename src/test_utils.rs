// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/test_utils.rs - 测试用的脚本化输入与推理后端
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
  collections::VecDeque,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
    mpsc::{Receiver, Sender},
  },
};

use image::RgbImage;
use thiserror::Error;

use crate::{
  frame::{LEPTON_HEIGHT, LEPTON_WIDTH, RawFrame},
  geometry::BBox,
  input::FrameSource,
  model::{InferenceEngine, LayerOutput, ModelKind, ModelSpec},
};

/// 背景计数，约 21.9 °C
pub const BACKGROUND_RAW: f32 = 29500.0;
/// 37.0 °C
pub const FACE_RAW_37C: f32 = 31015.0;
/// `face_row(0.5, 0.5, 0.25, 0.25, _)` 在 160x120 帧上解码出的框
pub const FACE_BOX: BBox = BBox::new(60, 45, 40, 30);

/// 单类别预测行 `[cx, cy, w, h, objectness, score]`
pub fn face_row(cx: f32, cy: f32, w: f32, h: f32, score: f32) -> Vec<f32> {
  vec![cx, cy, w, h, 1.0, score]
}

/// Lepton 尺寸的帧，`FACE_BOX` 区域内为 `face_raw`
pub fn warm_face_frame(face_raw: f32) -> RawFrame {
  let mut frame = RawFrame::filled(LEPTON_WIDTH, LEPTON_HEIGHT, BACKGROUND_RAW).unwrap();
  for y in FACE_BOX.y..FACE_BOX.y + FACE_BOX.h {
    for x in FACE_BOX.x..FACE_BOX.x + FACE_BOX.w {
      frame.set(x as u32, y as u32, face_raw);
    }
  }
  frame
}

#[derive(Error, Debug)]
#[error("scripted engine never fails")]
pub struct Infallible;

#[derive(Debug, Clone, Default)]
pub struct LoadCounter(Arc<AtomicUsize>);

impl LoadCounter {
  pub fn get(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}

/// 每次推理都返回同一组预测行
pub struct ScriptedEngine {
  rows: Vec<Vec<f32>>,
  active: Option<ModelKind>,
  loads: LoadCounter,
  last_input_size: Option<(u32, u32)>,
}

impl ScriptedEngine {
  pub fn new(rows: Vec<Vec<f32>>) -> Self {
    Self {
      rows,
      active: None,
      loads: LoadCounter::default(),
      last_input_size: None,
    }
  }

  pub fn load_counter(&self) -> LoadCounter {
    self.loads.clone()
  }

  pub fn last_input_size(&self) -> Option<(u32, u32)> {
    self.last_input_size
  }
}

impl InferenceEngine for ScriptedEngine {
  type Error = Infallible;

  fn load_model(&mut self, spec: &ModelSpec) -> Result<(), Self::Error> {
    self.loads.0.fetch_add(1, Ordering::SeqCst);
    self.active = Some(spec.kind);
    Ok(())
  }

  fn active_model(&self) -> Option<ModelKind> {
    self.active
  }

  fn set_gpu(&mut self, _use_gpu: bool) -> Result<(), Self::Error> {
    Ok(())
  }

  fn forward(&mut self, input: &RgbImage) -> Result<Vec<LayerOutput>, Self::Error> {
    self.last_input_size = Some(input.dimensions());
    let row_len = self.rows.first().map_or(6, Vec::len);
    Ok(vec![LayerOutput::new(self.rows.concat(), row_len)])
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScriptedSourceError {
  #[error("采集抖动")]
  Glitch,
  #[error("设备不存在")]
  Gone,
}

pub enum Step {
  Frame(RawFrame),
  Glitch,
  Disconnect,
}

/// 按脚本依次产出帧或故障，脚本耗尽视为断开
pub struct ScriptedSource {
  steps: VecDeque<Step>,
  connected: bool,
}

impl ScriptedSource {
  pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
    Self {
      steps: steps.into_iter().collect(),
      connected: true,
    }
  }
}

impl FrameSource for ScriptedSource {
  type Error = ScriptedSourceError;

  fn capture(&mut self) -> Result<RawFrame, Self::Error> {
    match self.steps.pop_front() {
      Some(Step::Frame(frame)) => Ok(frame),
      Some(Step::Glitch) => Err(ScriptedSourceError::Glitch),
      Some(Step::Disconnect) | None => {
        self.connected = false;
        Err(ScriptedSourceError::Gone)
      }
    }
  }

  fn is_connected(&self) -> bool {
    self.connected
  }
}

/// 每次采集先通知 `entered`，再等 `gate` 放行；`gate` 关闭即断开
pub struct GatedSource {
  frame: RawFrame,
  entered: Sender<()>,
  gate: Receiver<()>,
  connected: bool,
}

impl GatedSource {
  pub fn new(frame: RawFrame, entered: Sender<()>, gate: Receiver<()>) -> Self {
    Self {
      frame,
      entered,
      gate,
      connected: true,
    }
  }
}

impl FrameSource for GatedSource {
  type Error = ScriptedSourceError;

  fn capture(&mut self) -> Result<RawFrame, Self::Error> {
    let _ = self.entered.send(());
    match self.gate.recv() {
      Ok(()) => Ok(self.frame.clone()),
      Err(_) => {
        self.connected = false;
        Err(ScriptedSourceError::Gone)
      }
    }
  }

  fn is_connected(&self) -> bool {
    self.connected
  }
}
