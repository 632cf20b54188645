// 该文件是 Yebing（叶病）项目的一部分。
// src/input/preprocess.rs - CPU letterbox 与图像增强
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

use std::{borrow::Cow, cell::OnceCell};

use image::{RgbImage, imageops::FilterType};
use tracing::debug;

use crate::{
  augment::{AugmentationKind, AugmentationSpec},
  error::DetectError,
  frame::ChwTensor,
  geometry::Dims,
  input::Preprocessor,
};

const BACKGROUND: [u8; 3] = [255, 255, 255];
const MID_GREY: f32 = 127.5;

/// 基于 `image` 的预处理器
///
/// 白色背景上居中绘制等比缩放的原图；几何增强绕缩放后图像的中心进行，
/// 像素增强（亮度、对比度）逐通道作用后截断到 [0, 255]。
/// 等比缩放与增强无关，首次预处理后缓存。
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
  image: RgbImage,
  resized: OnceCell<(usize, RgbImage)>,
}

impl From<RgbImage> for ImagePreprocessor {
  fn from(image: RgbImage) -> Self {
    Self {
      image,
      resized: OnceCell::new(),
    }
  }
}

impl ImagePreprocessor {
  fn resize_to(&self, size: usize) -> RgbImage {
    let (width, height) = self.image.dimensions();
    let input = size as f32;
    let scale = (input / width as f32).min(input / height as f32);
    image::imageops::resize(
      &self.image,
      ((width as f32 * scale).round() as u32).max(1),
      ((height as f32 * scale).round() as u32).max(1),
      FilterType::Triangle,
    )
  }

  /// 缩放到 `size` 画布内的原图，仅缓存第一次请求的尺寸
  fn letterboxed(&self, size: usize) -> Cow<'_, RgbImage> {
    let (cached_size, cached) = self.resized.get_or_init(|| (size, self.resize_to(size)));
    if *cached_size == size {
      Cow::Borrowed(cached)
    } else {
      Cow::Owned(self.resize_to(size))
    }
  }
}

/// 画布坐标 → 缩放后图像局部坐标的逆变换
fn inverse_transform(kind: &AugmentationKind, ux: f32, uy: f32) -> (f32, f32) {
  match *kind {
    AugmentationKind::Rotate(deg) => {
      let (sin, cos) = (-deg.to_radians()).sin_cos();
      (ux * cos - uy * sin, ux * sin + uy * cos)
    }
    AugmentationKind::FlipHorizontal => (-ux, uy),
    AugmentationKind::Zoom(factor) => (ux / factor, uy / factor),
    _ => (ux, uy),
  }
}

fn filter_pixel(kind: &AugmentationKind, rgb: [u8; 3]) -> [u8; 3] {
  let apply = |f: &dyn Fn(f32) -> f32| rgb.map(|c| f(c as f32).round().clamp(0.0, 255.0) as u8);
  match *kind {
    AugmentationKind::Brightness(factor) => apply(&|c| c * factor),
    AugmentationKind::Contrast(factor) => apply(&|c| (c - MID_GREY) * factor + MID_GREY),
    _ => rgb,
  }
}

impl Preprocessor for ImagePreprocessor {
  fn original_dims(&self) -> Dims {
    Dims::new(self.image.width() as f32, self.image.height() as f32)
  }

  fn prepare(&self, spec: &AugmentationSpec, tensor: &mut ChwTensor) -> Result<(), DetectError> {
    let (width, height) = self.image.dimensions();
    if width == 0 || height == 0 {
      return Err(DetectError::Preprocess("输入图像为空".to_string()));
    }

    let size = tensor.size();
    let input = size as f32;
    let scale = (input / width as f32).min(input / height as f32);
    let scaled_w = width as f32 * scale;
    let scaled_h = height as f32 * scale;
    let x_offset = (input - scaled_w) / 2.0;
    let y_offset = (input - scaled_h) / 2.0;

    let resized = self.letterboxed(size);
    let (rw, rh) = resized.dimensions();
    debug!(
      "预处理 {}: {}x{} -> {}x{} (偏移 {:.1}, {:.1})",
      spec.id, width, height, rw, rh, x_offset, y_offset
    );

    let center_x = x_offset + scaled_w / 2.0;
    let center_y = y_offset + scaled_h / 2.0;

    for py in 0..size {
      for px in 0..size {
        let ux = px as f32 + 0.5 - center_x;
        let uy = py as f32 + 0.5 - center_y;
        let (vx, vy) = inverse_transform(&spec.kind, ux, uy);
        let lx = (vx + scaled_w / 2.0) * rw as f32 / scaled_w;
        let ly = (vy + scaled_h / 2.0) * rh as f32 / scaled_h;

        let rgb = if lx >= 0.0 && ly >= 0.0 && (lx as u32) < rw && (ly as u32) < rh {
          filter_pixel(&spec.kind, resized.get_pixel(lx as u32, ly as u32).0)
        } else {
          BACKGROUND
        };
        tensor.put_rgb(px, py, rgb);
      }
    }

    Ok(())
  }
}
