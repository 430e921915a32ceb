// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/region.rs - 按检测框裁剪区域（可向外扩展）
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
use thiserror::Error;

use crate::{frame::RawFrame, geometry::BBox};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
  #[error("裁剪区域越界: {bbox:?} 不在 {width}x{height} 范围内")]
  InvalidRegion { bbox: BBox, width: u32, height: u32 },
  #[error("裁剪区域为空: {0:?}")]
  EmptyRegion(BBox),
  #[error("扩展比例无效: ({0}, {1})")]
  InvalidZoom(f64, f64),
}

/// 可按框裁剪的二维数据
pub trait Crop: Sized {
  fn dimensions(&self) -> (u32, u32);

  /// `bbox` 已保证在范围内
  fn crop_unchecked(&self, bbox: &BBox) -> Result<Self, RegionError>;
}

impl Crop for RawFrame {
  fn dimensions(&self) -> (u32, u32) {
    (self.width(), self.height())
  }

  fn crop_unchecked(&self, bbox: &BBox) -> Result<Self, RegionError> {
    if bbox.is_degenerate() {
      return Err(RegionError::EmptyRegion(*bbox));
    }
    let (x, y, w, h) = (
      bbox.x as usize,
      bbox.y as usize,
      bbox.w as usize,
      bbox.h as usize,
    );
    let mut data = Vec::with_capacity(w * h);
    for row in self.rows().skip(y).take(h) {
      data.extend_from_slice(&row[x..x + w]);
    }
    RawFrame::new(bbox.w as u32, bbox.h as u32, data).map_err(|_| RegionError::InvalidRegion {
      bbox: *bbox,
      width: self.width(),
      height: self.height(),
    })
  }
}

impl Crop for RgbImage {
  fn dimensions(&self) -> (u32, u32) {
    RgbImage::dimensions(self)
  }

  fn crop_unchecked(&self, bbox: &BBox) -> Result<Self, RegionError> {
    let view = image::imageops::crop_imm(
      self,
      bbox.x as u32,
      bbox.y as u32,
      bbox.w as u32,
      bbox.h as u32,
    );
    Ok(view.to_image())
  }
}

/// 计算向外扩展并修正后的裁剪框。
///
/// 宽度扩展 `ceil(w * x_zoom_out)` 像素、高度扩展 `ceil(h * y_zoom_out)` 像素，
/// 两侧各分一半。
pub fn zoomed_box(
  bbox: &BBox,
  bounds: (u32, u32),
  x_zoom_out: f64,
  y_zoom_out: f64,
) -> Result<BBox, RegionError> {
  if !(x_zoom_out.is_finite() && y_zoom_out.is_finite()) || x_zoom_out < 0.0 || y_zoom_out < 0.0 {
    return Err(RegionError::InvalidZoom(x_zoom_out, y_zoom_out));
  }

  let x_zoom = (f64::from(bbox.w) * x_zoom_out).ceil() as i32;
  let y_zoom = (f64::from(bbox.h) * y_zoom_out).ceil() as i32;

  let expanded = BBox {
    x: bbox.x - x_zoom / 2,
    y: bbox.y - y_zoom / 2,
    w: bbox.w + x_zoom,
    h: bbox.h + y_zoom,
  };
  Ok(expanded.clamped(bounds.0, bounds.1))
}

/// 从帧中裁出检测框区域，`0` 扩展比例即原框
pub fn extract<T: Crop>(
  frame: &T,
  bbox: &BBox,
  x_zoom_out: f64,
  y_zoom_out: f64,
) -> Result<T, RegionError> {
  let (width, height) = frame.dimensions();
  let region = zoomed_box(bbox, (width, height), x_zoom_out, y_zoom_out)?;

  let inside = region.x >= 0
    && region.y >= 0
    && region.w >= 0
    && region.h >= 0
    && i64::from(region.x) + i64::from(region.w) < i64::from(width)
    && i64::from(region.y) + i64::from(region.h) < i64::from(height);
  if !inside {
    return Err(RegionError::InvalidRegion {
      bbox: region,
      width,
      height,
    });
  }

  frame.crop_unchecked(&region)
}
