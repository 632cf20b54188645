// 该文件是 Yebing（叶病）项目的一部分。
// src/nms.rs - 单轮非极大值抑制
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

use std::cmp::Ordering;

use tracing::debug;

use crate::{config::DetectConfig, model::BoundingBox};

/// 按置信度降序的稳定排序，相同置信度保持原有顺序
pub fn sort_by_confidence(boxes: &mut [BoundingBox]) {
  boxes.sort_by(|a, b| {
    b.confidence
      .partial_cmp(&a.confidence)
      .unwrap_or(Ordering::Equal)
  });
}

/// 贪心 NMS
///
/// 抑制不区分类别：任何与已保留框 IoU 超过阈值的框都会被移除，
/// 即使类别不同。这与常规的按类别 NMS 不同，保留它是为了与既有结果一致。
pub fn non_max_suppression(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
  sort_by_confidence(&mut boxes);

  let mut suppressed = vec![false; boxes.len()];
  let mut keep = Vec::with_capacity(boxes.len());

  for i in 0..boxes.len() {
    if suppressed[i] {
      continue;
    }
    for j in (i + 1)..boxes.len() {
      if !suppressed[j] && boxes[i].iou(&boxes[j]) > iou_threshold {
        suppressed[j] = true;
      }
    }
    keep.push(i);
  }

  let mut slots: Vec<Option<BoundingBox>> = boxes.into_iter().map(Some).collect();
  keep.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// NMS 后再做二次置信度过滤、重新排序并截断
pub fn suppress(boxes: Vec<BoundingBox>, config: &DetectConfig) -> Vec<BoundingBox> {
  let before = boxes.len();
  let kept = non_max_suppression(boxes, config.nms_iou_threshold);
  debug!("NMS: {} -> {}", before, kept.len());

  let mut kept: Vec<_> = kept
    .into_iter()
    .filter(|b| b.confidence > config.secondary_threshold)
    .collect();
  sort_by_confidence(&mut kept);
  kept.truncate(config.max_detections);
  kept
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bbox(x: f32, y: f32, w: f32, h: f32, confidence: f32, class_id: usize) -> BoundingBox {
    BoundingBox {
      x,
      y,
      width: w,
      height: h,
      confidence,
      class_id,
      label: format!("Class {}", class_id),
    }
  }

  #[test]
  fn overlapping_pair_keeps_the_stronger_box() {
    // 两框 IoU = 0.6: 交集 75x100，并集 125x100
    let boxes = vec![
      bbox(0.0, 0.0, 100.0, 100.0, 0.6, 0),
      bbox(25.0, 0.0, 100.0, 100.0, 0.8, 0),
      bbox(400.0, 400.0, 50.0, 50.0, 0.7, 1),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].confidence, 0.8);
    assert_eq!(kept[1].confidence, 0.7);
  }

  #[test]
  fn suppression_crosses_classes() {
    let boxes = vec![
      bbox(0.0, 0.0, 100.0, 100.0, 0.9, 0),
      bbox(25.0, 0.0, 100.0, 100.0, 0.8, 3),
      bbox(400.0, 400.0, 50.0, 50.0, 0.7, 1),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|b| b.class_id != 3));
  }

  #[test]
  fn output_is_sorted_subset() {
    let boxes: Vec<_> = (0..20)
      .map(|i| bbox((i % 5) as f32 * 30.0, (i / 5) as f32 * 30.0, 40.0, 40.0, 0.3 + i as f32 * 0.03, 0))
      .collect();
    let kept = non_max_suppression(boxes.clone(), 0.4);
    assert!(kept.len() <= boxes.len());
    assert!(kept.iter().all(|k| boxes.contains(k)));
    assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
  }

  #[test]
  fn ties_keep_input_order() {
    let boxes = vec![
      bbox(0.0, 0.0, 10.0, 10.0, 0.5, 0),
      bbox(1.0, 0.0, 10.0, 10.0, 0.5, 1),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 0);
  }

  #[test]
  fn suppress_filters_and_truncates() {
    let mut boxes: Vec<_> = (0..8)
      .map(|i| bbox(i as f32 * 100.0, 0.0, 50.0, 50.0, 0.35 + i as f32 * 0.05, 0))
      .collect();
    boxes.push(bbox(0.0, 500.0, 50.0, 50.0, 0.3, 0));
    let kept = suppress(boxes, &DetectConfig::default());
    assert_eq!(kept.len(), 5);
    assert!(kept.iter().all(|b| b.confidence > 0.3));
    assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
  }

  #[test]
  fn empty_input_is_fine() {
    assert!(suppress(Vec::new(), &DetectConfig::default()).is_empty());
  }
}
