// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/geometry.rs - 边界框与越界修正
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

/// 整数边界框，左上角坐标加宽高，位于原始帧坐标系中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BBox {
  pub x: i32,
  pub y: i32,
  pub w: i32,
  pub h: i32,
}

impl BBox {
  pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
    Self { x, y, w, h }
  }

  /// 宽或高为 0 的退化框
  pub fn is_degenerate(&self) -> bool {
    self.w <= 0 || self.h <= 0
  }

  pub fn area(&self) -> i64 {
    i64::from(self.w.max(0)) * i64::from(self.h.max(0))
  }

  /// 两个框的交集面积
  pub fn intersection_area(&self, other: &BBox) -> i64 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = (self.x + self.w).min(other.x + other.w);
    let y2 = (self.y + self.h).min(other.y + other.h);
    i64::from((x2 - x1).max(0)) * i64::from((y2 - y1).max(0))
  }

  /// 交并比，并集为 0 时返回 0
  pub fn iou(&self, other: &BBox) -> f32 {
    let intersection = self.intersection_area(other);
    let union = self.area() + other.area() - intersection;
    if union > 0 {
      (intersection as f64 / union as f64) as f32
    } else {
      0.0
    }
  }

  /// 修正到 `bounds_w x bounds_h` 范围内，返回新的框
  pub fn clamped(&self, bounds_w: u32, bounds_h: u32) -> BBox {
    clamp(bounds_w, bounds_h, *self)
  }
}

/// 将框修正到帧范围内。
///
/// 结果满足 `0 <= x <= max_x`、`x + w <= max_x`（y/h 同理），
/// 其中 `max_x = bounds_w - 1`。完全落在帧外的框会退化为宽或高为 0。
pub fn clamp(bounds_w: u32, bounds_h: u32, bbox: BBox) -> BBox {
  let (x, w) = clamp_axis(bbox.x, bbox.w, axis_max(bounds_w));
  let (y, h) = clamp_axis(bbox.y, bbox.h, axis_max(bounds_h));
  BBox { x, y, w, h }
}

fn axis_max(bound: u32) -> i32 {
  i32::try_from(bound).unwrap_or(i32::MAX).saturating_sub(1).max(0)
}

fn clamp_axis(mut pos: i32, mut len: i32, max: i32) -> (i32, i32) {
  if pos < 0 {
    len = len.saturating_add(pos);
    pos = 0;
  }
  if pos > max {
    pos = max;
    len = 0;
  }
  if pos.saturating_add(len) > max {
    len = max - pos;
  }
  (pos, len.max(0))
}
