// 该文件是 Yebing（叶病）项目的一部分。
// src/classify.rs - 合并结果的置信度分级
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

use crate::{config::DetectConfig, model::ConsolidatedDetection};

/// 两个标志相互独立：只有单票的结果即使置信度很高也是不确定的
pub fn classify(detection: &mut ConsolidatedDetection, config: &DetectConfig) {
  detection.is_high_confidence = detection.avg_confidence >= config.high_confidence_threshold;
  detection.is_uncertain =
    detection.avg_confidence < config.uncertain_threshold || detection.votes < config.min_votes;
}

pub fn classify_all(detections: &mut [ConsolidatedDetection], config: &DetectConfig) {
  for detection in detections.iter_mut() {
    classify(detection, config);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  fn detection(avg_confidence: f32, votes: usize) -> ConsolidatedDetection {
    ConsolidatedDetection {
      bbox: BoundingBox {
        x: 0.0,
        y: 0.0,
        width: 10.0,
        height: 10.0,
        confidence: avg_confidence,
        class_id: 0,
        label: "Brown spot".to_string(),
      },
      votes,
      avg_confidence,
      is_high_confidence: false,
      is_uncertain: false,
    }
  }

  #[test]
  fn two_votes_at_point_seven_is_normal() {
    let mut d = detection(0.7, 2);
    classify(&mut d, &DetectConfig::default());
    assert!(!d.is_uncertain);
    assert!(!d.is_high_confidence);
  }

  #[test]
  fn single_vote_is_uncertain_even_when_confident() {
    let mut d = detection(0.95, 1);
    classify(&mut d, &DetectConfig::default());
    assert!(d.is_uncertain);
    assert!(d.is_high_confidence);
  }

  #[test]
  fn threshold_boundaries() {
    let config = DetectConfig::default();
    let mut ds = vec![detection(0.75, 3), detection(0.5, 3), detection(0.49, 5)];
    classify_all(&mut ds, &config);
    let flags: Vec<_> = ds
      .iter()
      .map(|d| (d.is_high_confidence, d.is_uncertain))
      .collect();
    assert_eq!(flags, [(true, false), (false, false), (false, true)]);
  }
}
