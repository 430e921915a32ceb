// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/frame.rs - 辐射帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

use crate::palette::Palette;

/// Lepton 传感器分辨率
pub const LEPTON_WIDTH: u32 = 160;
pub const LEPTON_HEIGHT: u32 = 120;

/// 彩色帧：行 x 列 x 3 通道，8 位
pub type ColorFrame = RgbImage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("帧尺寸无效: {0}x{1}")]
  EmptyShape(u32, u32),
}

/// 辐射帧，每个像素为传感器原始计数
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
  width: u32,
  height: u32,
  data: Box<[f32]>,
}

impl RawFrame {
  pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, FrameError> {
    if width == 0 || height == 0 {
      return Err(FrameError::EmptyShape(width, height));
    }
    let expected = width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  /// 同一值填充的帧
  pub fn filled(width: u32, height: u32, value: f32) -> Result<Self, FrameError> {
    Self::new(width, height, vec![value; width as usize * height as usize])
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, x: u32, y: u32) -> Option<f32> {
    if x >= self.width || y >= self.height {
      return None;
    }
    Some(self.data[(y * self.width + x) as usize])
  }

  pub fn set(&mut self, x: u32, y: u32, value: f32) {
    if x < self.width && y < self.height {
      self.data[(y * self.width + x) as usize] = value;
    }
  }

  pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.width as usize)
  }

  pub fn max_value(&self) -> f32 {
    self.data.iter().copied().fold(f32::MIN, f32::max)
  }

  pub fn min_value(&self) -> f32 {
    self.data.iter().copied().fold(f32::MAX, f32::min)
  }

  /// 按帧内最小/最大值归一化到 8 位后查调色板。
  /// 全帧同值时所有像素映射到查找表首项。
  pub fn to_color_image(&self, palette: Palette) -> ColorFrame {
    let lut = palette.lut();
    let min = self.min_value();
    let range = self.max_value() - min;
    let width = self.width as usize;

    ImageBuffer::from_fn(self.width, self.height, |x, y| {
      let value = self.data[y as usize * width + x as usize];
      let level = if range > 0.0 {
        (255.0 * (value - min) / range) as u8
      } else {
        0
      };
      Rgb(lut[level as usize])
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_mismatched_length() {
    assert_eq!(
      RawFrame::new(4, 3, vec![0.0; 11]),
      Err(FrameError::LengthMismatch {
        expected: 12,
        actual: 11
      })
    );
    assert_eq!(RawFrame::new(0, 3, vec![]), Err(FrameError::EmptyShape(0, 3)));
  }

  #[test]
  fn indexes_row_major() {
    let frame = RawFrame::new(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(frame.get(2, 1), Some(6.0));
    assert_eq!(frame.get(3, 0), None);
    assert_eq!(frame.max_value(), 6.0);
    assert_eq!(frame.min_value(), 1.0);
    assert_eq!(frame.rows().count(), 2);
  }

  #[test]
  fn color_image_spans_palette_from_min_to_max() {
    let frame = RawFrame::new(2, 1, vec![29000.0, 31000.0]).unwrap();
    let image = frame.to_color_image(Palette::Hot);
    assert_eq!(image.dimensions(), (2, 1));
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255]);
  }

  #[test]
  fn flat_frame_maps_to_first_entry() {
    let frame = RawFrame::filled(3, 3, 30000.0).unwrap();
    let image = frame.to_color_image(Palette::Autumn);
    assert!(image.pixels().all(|p| p.0 == [255, 0, 0]));
  }
}
