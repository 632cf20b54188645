// 该文件是 Yebing（叶病）项目的一部分。
// src/augment.rs - 推理前的确定性图像增强目录
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

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AugmentationKind {
  Identity,
  /// 绕 letterbox 区域中心旋转，单位为度，正值为顺时针
  Rotate(f32),
  FlipHorizontal,
  Brightness(f32),
  Contrast(f32),
  /// 绕 letterbox 区域中心缩放
  Zoom(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AugmentationSpec {
  pub id: &'static str,
  pub kind: AugmentationKind,
}

impl AugmentationSpec {
  const fn new(id: &'static str, kind: AugmentationKind) -> Self {
    Self { id, kind }
  }

  pub fn is_identity(&self) -> bool {
    matches!(self.kind, AugmentationKind::Identity)
  }
}

/// 固定顺序的增强目录
///
/// 默认轮次预算为 5，`zoom_out` 只有在预算达到 9 时才会被使用。
pub const CATALOG: [AugmentationSpec; 9] = [
  AugmentationSpec::new("original", AugmentationKind::Identity),
  AugmentationSpec::new("rotate_5", AugmentationKind::Rotate(5.0)),
  AugmentationSpec::new("rotate_-5", AugmentationKind::Rotate(-5.0)),
  AugmentationSpec::new("flip_horizontal", AugmentationKind::FlipHorizontal),
  AugmentationSpec::new("brightness_up", AugmentationKind::Brightness(1.1)),
  AugmentationSpec::new("brightness_down", AugmentationKind::Brightness(0.9)),
  AugmentationSpec::new("contrast_up", AugmentationKind::Contrast(1.1)),
  AugmentationSpec::new("zoom_in", AugmentationKind::Zoom(1.05)),
  AugmentationSpec::new("zoom_out", AugmentationKind::Zoom(0.95)),
];

/// 按目录顺序取前 `min(pass_budget, |CATALOG|)` 项
pub fn select(pass_budget: usize) -> &'static [AugmentationSpec] {
  &CATALOG[..pass_budget.min(CATALOG.len())]
}

pub fn find(id: &str) -> Option<&'static AugmentationSpec> {
  CATALOG.iter().find(|spec| spec.id == id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_budget_uses_first_five_in_order() {
    let ids: Vec<_> = select(5).iter().map(|s| s.id).collect();
    assert_eq!(
      ids,
      ["original", "rotate_5", "rotate_-5", "flip_horizontal", "brightness_up"]
    );
  }

  #[test]
  fn budget_is_capped_by_catalog() {
    assert_eq!(select(100).len(), CATALOG.len());
    assert_eq!(select(1)[0].id, "original");
    assert!(select(1)[0].is_identity());
    assert!(select(0).is_empty());
  }

  #[test]
  fn catalog_ids_are_unique() {
    for (i, a) in CATALOG.iter().enumerate() {
      assert!(CATALOG[i + 1..].iter().all(|b| b.id != a.id));
      assert_eq!(find(a.id), Some(a));
    }
  }
}
