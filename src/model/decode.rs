// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/model/decode.rs - 网络输出解码与非极大值抑制
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

use tracing::{debug, warn};

use crate::{
  geometry::BBox,
  model::{Detection, LayerOutput},
};

/// 框坐标与置信度所占的前 5 列
const BOX_COLUMNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
  /// 置信度下限（严格大于）
  pub score_threshold: f32,
  /// NMS 重叠上限
  pub nms_threshold: f32,
}

impl DecodeParams {
  /// 两个阈值取同一值
  pub fn shared(threshold: f32) -> Self {
    Self {
      score_threshold: threshold,
      nms_threshold: threshold,
    }
  }
}

/// 将逐层预测解码为帧坐标下的检测结果
pub fn decode(
  layers: &[LayerOutput],
  frame_w: u32,
  frame_h: u32,
  params: &DecodeParams,
) -> Vec<Detection> {
  let (fw, fh) = (f64::from(frame_w), f64::from(frame_h));
  let mut boxes = Vec::new();
  let mut scores = Vec::new();
  let mut classes = Vec::new();

  for (layer_idx, layer) in layers.iter().enumerate() {
    if layer.row_len() <= BOX_COLUMNS {
      warn!("输出层 {} 行长度 {} 不含类别分数, 跳过", layer_idx, layer.row_len());
      continue;
    }

    for row in layer.rows() {
      let (class_id, confidence) = arg_max(&row[BOX_COLUMNS..]);
      if confidence <= params.score_threshold {
        continue;
      }

      // 先截断为整数再换算左上角，与网络导出时的取整方式一致
      let center_x = (f64::from(row[0]) * fw) as i32;
      let center_y = (f64::from(row[1]) * fh) as i32;
      let width = (f64::from(row[2]) * fw) as i32;
      let height = (f64::from(row[3]) * fh) as i32;
      let x = (f64::from(center_x) - f64::from(width) / 2.0) as i32;
      let y = (f64::from(center_y) - f64::from(height) / 2.0) as i32;

      boxes.push(BBox::new(x, y, width, height));
      scores.push(confidence);
      classes.push(class_id);
    }
  }

  debug!("解码得到 {} 个候选框", boxes.len());

  let keep = non_max_suppression(&boxes, &scores, params.score_threshold, params.nms_threshold);
  debug!("NMS 后保留 {} 个检测", keep.len());

  keep
    .into_iter()
    .map(|i| Detection {
      bbox: boxes[i],
      class_id: classes[i],
      confidence: scores[i],
    })
    .collect()
}

// 并列最大时取第一个
fn arg_max(scores: &[f32]) -> (u32, f32) {
  let mut best = (0u32, f32::MIN);
  for (i, &score) in scores.iter().enumerate() {
    if score > best.1 {
      best = (i as u32, score);
    }
  }
  best
}

/// 不区分类别的贪心 NMS。
///
/// 分数严格大于 `score_threshold` 的框按分数降序（同分保持原顺序）依次考察，
/// 与已保留框的 IoU 都不超过 `nms_threshold` 时保留。返回保留框的下标。
pub fn non_max_suppression(
  boxes: &[BBox],
  scores: &[f32],
  score_threshold: f32,
  nms_threshold: f32,
) -> Vec<usize> {
  let mut order: Vec<usize> = (0..boxes.len().min(scores.len()))
    .filter(|&i| scores[i] > score_threshold)
    .collect();
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut keep: Vec<usize> = Vec::with_capacity(order.len());
  for idx in order {
    if keep
      .iter()
      .all(|&kept| boxes[kept].iou(&boxes[idx]) <= nms_threshold)
    {
      keep.push(idx);
    }
  }
  keep
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(cx: f32, cy: f32, w: f32, h: f32, scores: &[f32]) -> Vec<f32> {
    let mut row = vec![cx, cy, w, h, 1.0];
    row.extend_from_slice(scores);
    row
  }

  #[test]
  fn decodes_center_size_to_top_left_in_frame_space() {
    let layer = LayerOutput::new(row(0.5, 0.5, 0.25, 0.2, &[0.9]), 6);
    let detections = decode(&[layer], 160, 120, &DecodeParams::shared(0.5));
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bbox, BBox::new(60, 48, 40, 24));
    assert_eq!(detections[0].class_id, 0);
    assert!((detections[0].confidence - 0.9).abs() < 1e-6);
  }

  #[test]
  fn picks_arg_max_class_and_filters_strictly() {
    let mut data = row(0.2, 0.2, 0.1, 0.1, &[0.1, 0.7, 0.3]);
    data.extend(row(0.8, 0.8, 0.1, 0.1, &[0.5, 0.2, 0.1]));
    let layer = LayerOutput::new(data, 8);
    let detections = decode(&[layer], 100, 100, &DecodeParams::shared(0.5));
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_id, 1);
  }

  #[test]
  fn collects_candidates_across_layers() {
    let a = LayerOutput::new(row(0.2, 0.2, 0.1, 0.1, &[0.8]), 6);
    let b = LayerOutput::new(row(0.7, 0.7, 0.1, 0.1, &[0.6]), 6);
    let detections = decode(&[a, b], 200, 200, &DecodeParams::shared(0.4));
    assert_eq!(detections.len(), 2);
    assert!(detections[0].confidence > detections[1].confidence);
  }

  #[test]
  fn nms_suppresses_overlapping_lower_score() {
    let boxes = [
      BBox::new(10, 10, 40, 40),
      BBox::new(12, 12, 40, 40),
      BBox::new(100, 100, 20, 20),
    ];
    let scores = [0.8, 0.9, 0.7];
    assert_eq!(non_max_suppression(&boxes, &scores, 0.5, 0.5), vec![1, 2]);
  }

  #[test]
  fn nms_threshold_is_independent_of_score_cutoff() {
    let boxes = [BBox::new(0, 0, 10, 10), BBox::new(5, 0, 10, 10)];
    let scores = [0.9, 0.8];
    // IoU = 1/3
    assert_eq!(non_max_suppression(&boxes, &scores, 0.5, 0.5), vec![0, 1]);
    assert_eq!(non_max_suppression(&boxes, &scores, 0.5, 0.3), vec![0]);
  }

  #[test]
  fn nms_keeps_input_order_for_equal_scores() {
    let boxes = [BBox::new(0, 0, 5, 5), BBox::new(50, 50, 5, 5)];
    let scores = [0.6, 0.6];
    assert_eq!(non_max_suppression(&boxes, &scores, 0.5, 0.5), vec![0, 1]);
  }

  #[test]
  fn skips_layers_without_class_columns() {
    let layer = LayerOutput::new(vec![0.5, 0.5, 0.1, 0.1, 0.9], 5);
    assert!(decode(&[layer], 160, 120, &DecodeParams::shared(0.1)).is_empty());
  }
}
