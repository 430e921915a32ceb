// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/model/rknn.rs - RKNN NPU 推理后端
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

use image::RgbImage;
use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::model::{InferenceEngine, LayerOutput, ModelKind, ModelSpec};

/// 人脸检测只有一个类别
const DEFAULT_CLASSES: usize = 1;
const RKNN_EXTENSION: &str = "rknn";
const RKNN_NUM_INPUTS: u32 = 1;

#[derive(Error, Debug)]
pub enum RknnEngineError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("尚未加载模型")]
  NoModelLoaded,
}

impl RknnEngineError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknnEngineError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct RknnEngineBuilder {
  classes: usize,
  flags: InitFlags,
}

impl Default for RknnEngineBuilder {
  fn default() -> Self {
    Self {
      classes: DEFAULT_CLASSES,
      flags: InitFlags::default(),
    }
  }
}

impl RknnEngineBuilder {
  pub fn classes(mut self, classes: usize) -> Self {
    self.classes = classes.max(1);
    self
  }

  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build(self) -> RknnEngine {
    RknnEngine {
      classes: self.classes,
      flags: self.flags,
      loaded: None,
    }
  }
}

struct LoadedModel {
  kind: ModelKind,
  context: Context,
  num_outputs: u32,
}

/// 在 NPU 上运行转换为 `.rknn` 的检测模型。
///
/// 模型文件为权重文件同名、扩展名为 `rknn` 的文件。
pub struct RknnEngine {
  classes: usize,
  flags: InitFlags,
  loaded: Option<LoadedModel>,
}

impl RknnEngine {
  fn row_len(&self) -> usize {
    5 + self.classes
  }
}

impl InferenceEngine for RknnEngine {
  type Error = RknnEngineError;

  fn load_model(&mut self, spec: &ModelSpec) -> Result<(), Self::Error> {
    if self.active_model() == Some(spec.kind) {
      debug!("模型 {} 已在 NPU 上, 跳过加载", spec.kind);
      return Ok(());
    }

    let path = spec.weights.with_extension(RKNN_EXTENSION);
    info!("加载模型文件: {}", path.display());
    let model_data = std::fs::read(&path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let context = Context::new(&model_data, self.flags.clone())?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(RknnEngineError::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknnEngineError::invalid("无法获取输入数量", e))?;
    if num_inputs != RKNN_NUM_INPUTS {
      return Err(RknnEngineError::invalid(
        &format!("预期模型输入数量为 {}, 实际为 {}", RKNN_NUM_INPUTS, num_inputs),
        rknpu::Error::InvalidModel,
      ));
    }
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknnEngineError::invalid("无法获取输出数量", e))?;
    debug!("模型输出层数: {}", num_outputs);

    // 新上下文创建成功后才替换旧模型
    self.loaded = Some(LoadedModel {
      kind: spec.kind,
      context,
      num_outputs,
    });
    info!("模型 {} 加载完成", spec.kind);
    Ok(())
  }

  fn active_model(&self) -> Option<ModelKind> {
    self.loaded.as_ref().map(|model| model.kind)
  }

  fn set_gpu(&mut self, use_gpu: bool) -> Result<(), Self::Error> {
    if use_gpu {
      warn!("NPU 后端不使用 GPU, 忽略该选项");
    }
    Ok(())
  }

  fn forward(&mut self, input: &RgbImage) -> Result<Vec<LayerOutput>, Self::Error> {
    let row_len = self.row_len();
    let model = self.loaded.as_ref().ok_or(RknnEngineError::NoModelLoaded)?;

    debug!("设置模型输入");
    model
      .context
      .set_input(0, input.as_raw(), TensorFormat::NHWC, TensorType::UInt8)?;

    debug!("执行模型推理");
    model.context.run()?;

    let output = model.context.get_outputs()?;
    let layers = LayerOutput::read_all(model.num_outputs as usize, row_len, |idx| {
      output
        .get_f32(idx)
        .inspect_err(|e| error!("获取第 {} 个输出失败: {}", idx, e))
    })?;
    Ok(layers)
  }
}
