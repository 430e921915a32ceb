// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/output/draw.rs - 人脸框与温度标签绘制
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::Rgb;
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{frame::ColorFrame, geometry::BBox};

/// 内置标签字体 DejaVu Sans
static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

const LABEL_FONT_SIZE: f32 = 12.0;
/// 标签基线位于框上沿之上的像素数
const LABEL_BASELINE_OFFSET: i32 = 2;

const SAFE_COLOR: [u8; 3] = [50, 205, 50];
const ALERT_COLOR: [u8; 3] = [255, 0, 0];

#[derive(Error, Debug)]
pub enum FontError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 框的配色策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxStyle {
  Safe,
  Alert,
}

impl BoxStyle {
  pub fn for_face(over_threshold: bool) -> Self {
    if over_threshold {
      BoxStyle::Alert
    } else {
      BoxStyle::Safe
    }
  }

  pub fn color(&self) -> Rgb<u8> {
    match self {
      BoxStyle::Safe => Rgb(SAFE_COLOR),
      BoxStyle::Alert => Rgb(ALERT_COLOR),
    }
  }

  /// 告警框加粗一圈
  fn thickness(&self) -> i32 {
    match self {
      BoxStyle::Safe => 1,
      BoxStyle::Alert => 2,
    }
  }
}

/// 在显示帧上画框与温度标签。默认使用内置字体，没有字体时只画框。
pub struct Compositor {
  font: Option<FontArc>,
  scale: PxScale,
}

impl Default for Compositor {
  fn default() -> Self {
    match Self::with_default_font() {
      Ok(compositor) => compositor,
      Err(e) => {
        error!("内置字体无效: {}", e);
        Self::new(None)
      }
    }
  }
}

impl Compositor {
  pub fn new(font: Option<FontArc>) -> Self {
    if font.is_none() {
      warn!("未提供字体, 将只绘制人脸框");
    }
    Self {
      font,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  pub fn with_default_font() -> Result<Self, FontError> {
    let font = FontArc::try_from_slice(DEFAULT_FONT)?;
    Ok(Self::new(Some(font)))
  }

  pub fn from_font_file(path: &Path) -> Result<Self, FontError> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    info!("已加载字体 {}", path.display());
    Ok(Self::new(Some(font)))
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// `bbox` 已修正到帧内
  pub fn composite(&self, image: &mut ColorFrame, bbox: &BBox, style: BoxStyle, text: &str) {
    let color = style.color();

    for inset in 0..style.thickness() {
      let (w, h) = (bbox.w - 2 * inset, bbox.h - 2 * inset);
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    if let Some(font) = &self.font {
      let (_, text_height) = text_size(self.scale, font, text);
      let x = bbox.x + bbox.w / 2;
      let y = bbox.y - LABEL_BASELINE_OFFSET - text_height as i32;
      draw_text_mut(image, color, x, y.max(0), self.scale, font, text);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  #[test]
  fn style_follows_threshold_classification() {
    assert_eq!(BoxStyle::for_face(false), BoxStyle::Safe);
    assert_eq!(BoxStyle::for_face(true), BoxStyle::Alert);
    assert_eq!(BoxStyle::Safe.color(), Rgb([50, 205, 50]));
    assert_eq!(BoxStyle::Alert.color(), Rgb([255, 0, 0]));
  }

  #[test]
  fn draws_outline_without_font() {
    let mut image = RgbImage::new(40, 40);
    let compositor = Compositor::new(None);
    compositor.composite(&mut image, &BBox::new(5, 5, 10, 10), BoxStyle::Safe, "37.0");
    assert_eq!(*image.get_pixel(5, 5), Rgb(SAFE_COLOR));
    assert_eq!(*image.get_pixel(14, 14), Rgb(SAFE_COLOR));
    assert_eq!(*image.get_pixel(6, 6), Rgb([0, 0, 0]));
    assert_eq!(*image.get_pixel(10, 10), Rgb([0, 0, 0]));
  }

  #[test]
  fn alert_outline_is_emphasized() {
    let mut image = RgbImage::new(40, 40);
    let compositor = Compositor::new(None);
    compositor.composite(&mut image, &BBox::new(5, 5, 10, 10), BoxStyle::Alert, "38.5");
    assert_eq!(*image.get_pixel(5, 5), Rgb(ALERT_COLOR));
    assert_eq!(*image.get_pixel(6, 6), Rgb(ALERT_COLOR));
    assert_eq!(*image.get_pixel(7, 7), Rgb([0, 0, 0]));
  }

  #[test]
  fn default_compositor_labels_above_the_box() {
    let compositor = Compositor::default();
    assert!(compositor.has_font());

    let mut image = RgbImage::new(160, 120);
    let bbox = BBox::new(60, 45, 40, 30);
    compositor.composite(&mut image, &bbox, BoxStyle::Alert, "38.5");

    let label_pixels = image
      .enumerate_pixels()
      .filter(|(x, y, p)| *y < 45 && *x >= 80 && **p != Rgb([0, 0, 0]))
      .count();
    assert!(label_pixels > 0);
  }

  #[test]
  fn label_is_clamped_to_the_top_edge() {
    let mut image = RgbImage::new(40, 40);
    let compositor = Compositor::with_default_font().unwrap();
    compositor.composite(&mut image, &BBox::new(2, 1, 20, 20), BoxStyle::Safe, "37.0");
    // 框上方没有空间，标签压在框内
    let inside = image
      .enumerate_pixels()
      .filter(|(x, y, p)| (12..21).contains(x) && (2..20).contains(y) && **p != Rgb([0, 0, 0]))
      .count();
    assert!(inside > 0);
  }

  #[test]
  fn degenerate_box_draws_nothing() {
    let mut image = RgbImage::new(10, 10);
    Compositor::new(None).composite(&mut image, &BBox::new(3, 3, 0, 4), BoxStyle::Alert, "");
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }
}
