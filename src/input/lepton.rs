// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/input/lepton.rs - PureThermal / Lepton 热像仪输入
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
use tracing::{debug, error, info};
use url::Url;
use v4l::{
  Device, FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, video::Capture,
};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FrameError, LEPTON_HEIGHT, LEPTON_WIDTH, RawFrame},
  input::FrameSource,
};

/// 设备名中包含该字符串即视为热像仪
pub const DEVICE_NAME: &str = "PureThermal";

const Y16: &[u8; 4] = b"Y16 ";

#[derive(Error, Debug)]
pub enum LeptonInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("未找到 PureThermal 设备")]
  DeviceNotFound,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("设备不支持 Y16 160x120, 实际为 {0}")]
  UnsupportedFormat(String),
  #[error("帧缓冲区长度 {actual} 字节, 应为 {expected} 字节")]
  ShortBuffer { expected: usize, actual: usize },
  #[error("frame error: {0}")]
  FrameError(#[from] FrameError),
}

/// Lepton 辐射测温输入，Y16 格式，每像素为 0.01 K 单位的计数
pub struct LeptonInput {
  device_path: Option<PathBuf>,
  stream: Option<Stream<'static>>,
}

impl FromUrlWithScheme for LeptonInput {
  const SCHEME: &'static str = "lepton";
}

impl FromUrl for LeptonInput {
  type Error = LeptonInputError;

  /// `lepton://` 自动查找设备；`lepton:///dev/video2` 指定设备节点
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LeptonInputError::SchemaMismatch);
    }

    let device_path = match url.path() {
      "" | "/" => None,
      path => Some(PathBuf::from(path)),
    };

    Ok(LeptonInput {
      device_path,
      stream: None,
    })
  }
}

/// 在已枚举的视频设备中查找热像仪
pub fn find_device() -> Option<PathBuf> {
  v4l::context::enum_devices()
    .into_iter()
    .find(|node| {
      node
        .name()
        .is_some_and(|name| name.contains(DEVICE_NAME))
    })
    .map(|node| node.path().to_path_buf())
}

/// 将小端 16 位计数转换为辐射帧
pub fn y16_to_frame(buffer: &[u8], width: u32, height: u32) -> Result<RawFrame, LeptonInputError> {
  let expected = width as usize * height as usize * 2;
  if buffer.len() < expected {
    return Err(LeptonInputError::ShortBuffer {
      expected,
      actual: buffer.len(),
    });
  }

  let data: Vec<f32> = buffer[..expected]
    .chunks_exact(2)
    .map(|pair| f32::from(u16::from_le_bytes([pair[0], pair[1]])))
    .collect();
  Ok(RawFrame::new(width, height, data)?)
}

impl LeptonInput {
  fn resolve_path(&self) -> Result<PathBuf, LeptonInputError> {
    match &self.device_path {
      Some(path) => Ok(path.clone()),
      None => find_device().ok_or(LeptonInputError::DeviceNotFound),
    }
  }

  fn open(path: &Path) -> Result<Stream<'static>, LeptonInputError> {
    let device = Device::with_path(path)?;

    let mut format = device.format()?;
    format.width = LEPTON_WIDTH;
    format.height = LEPTON_HEIGHT;
    format.fourcc = FourCC::new(Y16);
    let format = device.set_format(&format)?;
    if format.fourcc != FourCC::new(Y16)
      || format.width != LEPTON_WIDTH
      || format.height != LEPTON_HEIGHT
    {
      return Err(LeptonInputError::UnsupportedFormat(format.to_string()));
    }

    // 流持有设备句柄，不借用 `device`
    let stream = Stream::with_buffers(&device, Type::VideoCapture, 4)?;
    info!("已打开热像仪 {}", path.display());
    Ok(stream)
  }
}

impl FrameSource for LeptonInput {
  type Error = LeptonInputError;

  fn capture(&mut self) -> Result<RawFrame, Self::Error> {
    if self.stream.is_none() {
      let path = self.resolve_path()?;
      self.stream = Some(Self::open(&path)?);
    }

    let Some(stream) = self.stream.as_mut() else {
      return Err(LeptonInputError::DeviceNotFound);
    };

    let result = stream
      .next()
      .map_err(LeptonInputError::from)
      .and_then(|(buffer, meta)| {
        debug!("采集到第 {} 帧, {} 字节", meta.sequence, buffer.len());
        y16_to_frame(buffer, LEPTON_WIDTH, LEPTON_HEIGHT)
      });

    // 出错后丢弃流，下次采集重新打开
    if result.is_err() {
      self.stream = None;
    }
    result
  }

  fn is_connected(&self) -> bool {
    match &self.device_path {
      Some(path) => path.exists(),
      None => find_device().is_some(),
    }
  }
}
