// 该文件是 Yebing（叶病）项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

pub const HEALTHY_COLOR: [u8; 3] = [0x22, 0xc5, 0x5e]; // 绿色
pub const SEVERE_COLOR: [u8; 3] = [0xef, 0x44, 0x44]; // 红色
pub const MODERATE_COLOR: [u8; 3] = [0xf9, 0x73, 0x16]; // 橙色
pub const UNKNOWN_COLOR: [u8; 3] = [0x8b, 0x5c, 0xf6]; // 紫色

const DISEASE_KEYWORDS: [&str; 8] = ["spot", "blight", "rust", "scab", "virus", "mildew", "rot", "mold"];
const SEVERE_KEYWORDS: [&str; 4] = ["blight", "rust", "rot", "virus"];
const MODERATE_KEYWORDS: [&str; 4] = ["spot", "scab", "mildew", "mold"];

/// 按病害严重程度为标签选择边框颜色（不区分大小写）
pub fn box_color(label: &str) -> [u8; 3] {
  let label = label.to_lowercase();
  let contains_any = |words: &[&str]| words.iter().any(|w| label.contains(w));

  if label.contains("healthy") {
    HEALTHY_COLOR
  } else if label.contains("diseased") {
    SEVERE_COLOR
  } else if label.contains("leaf") && !contains_any(&DISEASE_KEYWORDS) {
    HEALTHY_COLOR
  } else if contains_any(&SEVERE_KEYWORDS) {
    SEVERE_COLOR
  } else if contains_any(&MODERATE_KEYWORDS) {
    MODERATE_COLOR
  } else {
    UNKNOWN_COLOR
  }
}

#[cfg(feature = "save_image_file")]
pub use self::canvas::{CONFIDENT_THICKNESS, UNCERTAIN_THICKNESS, draw_bbox, draw_report};

#[cfg(feature = "save_image_file")]
mod canvas {
  use image::{Rgb, RgbImage};
  use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

  use super::box_color;
  use crate::{model::BoundingBox, task::DetectionReport};

  pub const CONFIDENT_THICKNESS: u32 = 2;
  pub const UNCERTAIN_THICKNESS: u32 = 1;

  /// 在显示尺寸的图像上绘制一个框，边框向内加粗
  pub fn draw_bbox(image: &mut RgbImage, bbox: &BoundingBox, thickness: u32) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let x_min = (bbox.x.floor() as i32).clamp(0, w - 1);
    let y_min = (bbox.y.floor() as i32).clamp(0, h - 1);
    let x_max = ((bbox.x + bbox.width).ceil() as i32).clamp(0, w - 1);
    let y_max = ((bbox.y + bbox.height).ceil() as i32).clamp(0, h - 1);

    let color = Rgb(box_color(&bbox.label));
    for t in 0..thickness as i32 {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  /// 先画不确定的框，再画可信的框，使可信框位于上层
  pub fn draw_report(image: &mut RgbImage, report: &DetectionReport) {
    for detection in report.uncertain.iter() {
      draw_bbox(image, &detection.bbox, UNCERTAIN_THICKNESS);
    }
    for bbox in report.confident.iter() {
      draw_bbox(image, bbox, CONFIDENT_THICKNESS);
    }
  }
}
