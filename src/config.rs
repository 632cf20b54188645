// 该文件是 Yebing（叶病）项目的一部分。
// src/config.rs - 检测阈值与轮次配置
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

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DetectError;

pub const CONFIDENCE_THRESHOLD: f32 = 0.4;
pub const NMS_IOU_THRESHOLD: f32 = 0.4;
pub const SECONDARY_THRESHOLD: f32 = 0.3;
pub const CONSOLIDATION_IOU_THRESHOLD: f32 = 0.3;
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.75;
pub const UNCERTAIN_THRESHOLD: f32 = 0.5;
pub const MIN_VOTES: usize = 2;
pub const MAX_DETECTIONS: usize = 5;
pub const PASS_BUDGET: usize = 5;

/// 一次检测运行使用的全部阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
  /// 解码阶段的类别置信度下限（严格大于）
  pub confidence_threshold: f32,
  /// 单轮 NMS 的 IoU 阈值
  pub nms_iou_threshold: f32,
  /// NMS 之后的二次置信度过滤
  pub secondary_threshold: f32,
  /// 跨轮次归组的 IoU 阈值
  pub consolidation_iou_threshold: f32,
  pub high_confidence_threshold: f32,
  pub uncertain_threshold: f32,
  /// 少于该票数的合并结果视为不确定
  pub min_votes: usize,
  pub max_detections: usize,
  /// 推理轮次上限，按增强目录顺序取前 N 项
  pub pass_budget: usize,
  /// 轮次之间让出调度
  pub cooperative_yield: bool,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: CONFIDENCE_THRESHOLD,
      nms_iou_threshold: NMS_IOU_THRESHOLD,
      secondary_threshold: SECONDARY_THRESHOLD,
      consolidation_iou_threshold: CONSOLIDATION_IOU_THRESHOLD,
      high_confidence_threshold: HIGH_CONFIDENCE_THRESHOLD,
      uncertain_threshold: UNCERTAIN_THRESHOLD,
      min_votes: MIN_VOTES,
      max_detections: MAX_DETECTIONS,
      pass_budget: PASS_BUDGET,
      cooperative_yield: true,
    }
  }
}

impl DetectConfig {
  pub fn with_pass_budget(mut self, pass_budget: usize) -> Self {
    self.pass_budget = pass_budget;
    self
  }

  pub fn with_cooperative_yield(mut self, cooperative_yield: bool) -> Self {
    self.cooperative_yield = cooperative_yield;
    self
  }

  /// 从 JSON 文件读取配置，缺省字段使用默认值
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DetectError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|e| DetectError::invalid(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
    let config: DetectConfig = serde_json::from_str(&text)
      .map_err(|e| DetectError::invalid(format!("无法解析配置文件 {}: {}", path.display(), e)))?;
    debug!("已加载配置: {:?}", config);
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), DetectError> {
    let thresholds = [
      ("confidence_threshold", self.confidence_threshold),
      ("nms_iou_threshold", self.nms_iou_threshold),
      ("secondary_threshold", self.secondary_threshold),
      ("consolidation_iou_threshold", self.consolidation_iou_threshold),
      ("high_confidence_threshold", self.high_confidence_threshold),
      ("uncertain_threshold", self.uncertain_threshold),
    ];
    for (name, value) in thresholds {
      if !(0.0..=1.0).contains(&value) {
        return Err(DetectError::invalid(format!(
          "{} 必须位于 [0, 1] 区间, 实际为 {}",
          name, value
        )));
      }
    }

    if self.max_detections == 0 {
      return Err(DetectError::invalid("max_detections 不能为 0"));
    }
    if self.pass_budget == 0 {
      return Err(DetectError::invalid("pass_budget 不能为 0"));
    }
    if self.min_votes == 0 {
      return Err(DetectError::invalid("min_votes 不能为 0"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_documented_thresholds() {
    let config = DetectConfig::default();
    assert_eq!(config.confidence_threshold, 0.4);
    assert_eq!(config.nms_iou_threshold, 0.4);
    assert_eq!(config.secondary_threshold, 0.3);
    assert_eq!(config.consolidation_iou_threshold, 0.3);
    assert_eq!(config.high_confidence_threshold, 0.75);
    assert_eq!(config.uncertain_threshold, 0.5);
    assert_eq!(config.max_detections, 5);
    assert_eq!(config.pass_budget, 5);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn partial_json_keeps_defaults() {
    let config: DetectConfig =
      serde_json::from_str(r#"{ "pass_budget": 8, "nms_iou_threshold": 0.5 }"#).unwrap();
    assert_eq!(config.pass_budget, 8);
    assert_eq!(config.nms_iou_threshold, 0.5);
    assert_eq!(config.confidence_threshold, CONFIDENCE_THRESHOLD);
  }

  #[test]
  fn rejects_out_of_range_values() {
    let mut config = DetectConfig::default();
    config.uncertain_threshold = 1.5;
    assert!(matches!(
      config.validate(),
      Err(DetectError::InvalidConfiguration(_))
    ));

    let config = DetectConfig::default().with_pass_budget(0);
    assert!(matches!(
      config.validate(),
      Err(DetectError::InvalidConfiguration(_))
    ));
  }

  #[test]
  fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "max_detections": 3, "cooperative_yield": false }"#).unwrap();
    let config = DetectConfig::from_json_file(&path).unwrap();
    assert_eq!(config.max_detections, 3);
    assert!(!config.cooperative_yield);
  }
}
