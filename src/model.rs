// 该文件是 Yebing（叶病）项目的一部分。
// src/model.rs - 检测结果数据模型
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

use serde::Serialize;

/// 显示空间中的检测框，`x`/`y` 为左上角
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  pub confidence: f32,
  pub class_id: usize,
  pub label: String,
}

impl BoundingBox {
  pub fn area(&self) -> f32 {
    self.width.max(0.0) * self.height.max(0.0)
  }

  /// 交并比，不相交时为 0
  pub fn iou(&self, other: &Self) -> f32 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = (self.x + self.width).min(other.x + other.width);
    let y2 = (self.y + self.height).min(other.y + other.height);

    if x2 <= x1 || y2 <= y1 {
      return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = self.area() + other.area() - intersection;
    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

/// 单轮推理（一种增强）在 NMS 之后的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassResult {
  pub augmentation_id: String,
  pub boxes: Vec<BoundingBox>,
}

/// 跨轮次投票合并后的检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedDetection {
  /// 组内逐分量平均后的框，`confidence` 为平均置信度
  #[serde(rename = "box")]
  pub bbox: BoundingBox,
  pub votes: usize,
  pub avg_confidence: f32,
  pub is_high_confidence: bool,
  pub is_uncertain: bool,
}

mod profile;
mod replay;
mod session;

pub use self::profile::{ModelProfile, ProfileError, builtin_profile, BUILTIN_PROFILES};
pub use self::replay::{ReplaySession, ReplaySessionError};
pub use self::session::{InferenceSession, NamedOutputs, RawOutput, SessionError};

#[cfg(test)]
mod tests {
  use super::*;

  fn bbox(x: f32, y: f32, width: f32, height: f32) -> BoundingBox {
    BoundingBox {
      x,
      y,
      width,
      height,
      confidence: 0.9,
      class_id: 0,
      label: "Leaf blast".to_string(),
    }
  }

  #[test]
  fn iou_of_box_with_itself_is_one() {
    let a = bbox(10.0, 10.0, 20.0, 20.0);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_is_symmetric() {
    let a = bbox(10.0, 10.0, 20.0, 20.0);
    let b = bbox(12.0, 11.0, 19.0, 21.0);
    assert_eq!(a.iou(&b), b.iou(&a));
    assert!(a.iou(&b) > 0.7 && a.iou(&b) < 0.8);
  }

  #[test]
  fn disjoint_and_touching_boxes_have_zero_iou() {
    let a = bbox(0.0, 0.0, 10.0, 10.0);
    assert_eq!(a.iou(&bbox(50.0, 50.0, 10.0, 10.0)), 0.0);
    assert_eq!(a.iou(&bbox(10.0, 0.0, 10.0, 10.0)), 0.0);
  }

  #[test]
  fn half_overlap() {
    let a = bbox(0.0, 0.0, 10.0, 10.0);
    let b = bbox(5.0, 0.0, 10.0, 10.0);
    // 50 / 150
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
  }
}
