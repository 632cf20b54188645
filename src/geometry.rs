// 该文件是 Yebing（叶病）项目的一部分。
// src/geometry.rs - 模型空间、原图空间与显示空间之间的坐标变换
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

use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// 图像尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dims {
  pub width: f32,
  pub height: f32,
}

impl Dims {
  pub const fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  fn is_valid(&self) -> bool {
    self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
  }
}

impl std::str::FromStr for Dims {
  type Err = String;

  /// 解析 `WxH` 形式的尺寸
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (w, h) = s
      .trim()
      .split_once(['x', 'X'])
      .ok_or_else(|| format!("尺寸格式应为 WxH, 实际为 '{}'", s))?;
    let width = w.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let height = h.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let dims = Dims::new(width, height);
    if !dims.is_valid() {
      return Err(format!("尺寸必须为正数, 实际为 '{}'", s));
    }
    Ok(dims)
  }
}

/// Letterbox 变换参数
///
/// 模型输入为 `input_size` 的正方形，原图按等比缩放后居中放置。
/// `scale` 与 `scale_to_display` 相互独立，需依次应用。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub original: Dims,
  pub display: Dims,
  pub input_size: f32,
  pub scale: f32,
  pub x_offset: f32,
  pub y_offset: f32,
  pub scale_to_display: f32,
}

impl Letterbox {
  pub fn new(original: Dims, input_size: u32, display: Dims) -> Result<Self, DetectError> {
    if !original.is_valid() {
      return Err(DetectError::invalid(format!("原图尺寸无效: {:?}", original)));
    }
    if !display.is_valid() {
      return Err(DetectError::invalid(format!("显示尺寸无效: {:?}", display)));
    }
    if input_size == 0 {
      return Err(DetectError::invalid("模型输入尺寸不能为 0"));
    }

    let input = input_size as f32;
    let scale = (input / original.width).min(input / original.height);
    let scaled_w = original.width * scale;
    let scaled_h = original.height * scale;

    Ok(Self {
      original,
      display,
      input_size: input,
      scale,
      x_offset: (input - scaled_w) / 2.0,
      y_offset: (input - scaled_h) / 2.0,
      scale_to_display: (display.width / original.width).min(display.height / original.height),
    })
  }

  /// 模型空间的点 → 原图空间
  pub fn point_to_original(&self, x: f32, y: f32) -> (f32, f32) {
    ((x - self.x_offset) / self.scale, (y - self.y_offset) / self.scale)
  }

  /// 模型空间的尺寸 → 原图空间
  pub fn size_to_original(&self, w: f32, h: f32) -> (f32, f32) {
    (w / self.scale, h / self.scale)
  }

  /// 原图空间的长度 → 显示空间
  pub fn to_display(&self, v: f32) -> f32 {
    v * self.scale_to_display
  }

  /// 模型空间中心点框 `[cx, cy, w, h]` → 显示空间左上角框 `[x, y, w, h]`，未裁剪
  pub fn center_box_to_display(&self, cx: f32, cy: f32, w: f32, h: f32) -> [f32; 4] {
    let (ox, oy) = self.point_to_original(cx, cy);
    let (ow, oh) = self.size_to_original(w, h);
    [
      self.to_display(ox - ow / 2.0),
      self.to_display(oy - oh / 2.0),
      self.to_display(ow),
      self.to_display(oh),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
  }

  #[test]
  fn landscape_image_is_padded_vertically() {
    let lb = Letterbox::new(Dims::new(1280.0, 640.0), 640, Dims::new(1280.0, 640.0)).unwrap();
    assert!(close(lb.scale, 0.5));
    assert!(close(lb.x_offset, 0.0));
    assert!(close(lb.y_offset, 160.0));
    assert!(close(lb.scale_to_display, 1.0));

    let (x, y) = lb.point_to_original(320.0, 320.0);
    assert!(close(x, 640.0));
    assert!(close(y, 320.0));
  }

  #[test]
  fn display_scale_is_applied_after_letterbox() {
    // 原图 800x400，显示为 400x200
    let lb = Letterbox::new(Dims::new(800.0, 400.0), 640, Dims::new(400.0, 200.0)).unwrap();
    assert!(close(lb.scale, 0.8));
    assert!(close(lb.y_offset, 160.0));
    assert!(close(lb.scale_to_display, 0.5));

    // 模型空间 (320, 320) 尺寸 64x32 → 原图中心 (400, 200) 尺寸 80x40
    let [x, y, w, h] = lb.center_box_to_display(320.0, 320.0, 64.0, 32.0);
    assert!(close(x, 180.0));
    assert!(close(y, 90.0));
    assert!(close(w, 40.0));
    assert!(close(h, 20.0));
  }

  #[test]
  fn rejects_empty_dimensions() {
    assert!(Letterbox::new(Dims::new(0.0, 10.0), 640, Dims::new(10.0, 10.0)).is_err());
    assert!(Letterbox::new(Dims::new(10.0, 10.0), 0, Dims::new(10.0, 10.0)).is_err());
  }

  #[test]
  fn parses_dims() {
    let dims: Dims = "800x600".parse().unwrap();
    assert_eq!(dims, Dims::new(800.0, 600.0));
    assert!("800".parse::<Dims>().is_err());
    assert!("0x600".parse::<Dims>().is_err());
  }
}
