// 该文件是 Yebing（叶病）项目的一部分。
// src/frame.rs - 1x3xSxS CHW 浮点输入张量
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

use crate::error::DetectError;

pub const RGB_CHANNELS: usize = 3;

/// 模型输入张量，R 平面、G 平面、B 平面依次排列，取值 [0, 1]
///
/// 同一次运行的所有轮次共用一个缓冲区，每轮预处理时整体覆盖。
#[derive(Debug, Clone)]
pub struct ChwTensor {
  size: usize,
  data: Box<[f32]>,
}

impl ChwTensor {
  pub fn with_size(size: usize) -> Self {
    Self {
      size,
      data: vec![0.0f32; RGB_CHANNELS * size * size].into_boxed_slice(),
    }
  }

  pub fn from_vec(size: usize, data: Vec<f32>) -> Result<Self, DetectError> {
    let expected = RGB_CHANNELS * size * size;
    if data.len() != expected {
      return Err(DetectError::Preprocess(format!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        expected,
        data.len()
      )));
    }
    Ok(Self {
      size,
      data: data.into_boxed_slice(),
    })
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// `[1, 3, S, S]`
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, self.size, self.size]
  }

  pub fn plane(&self, channel: usize) -> &[f32] {
    let pixels = self.size * self.size;
    &self.data[channel * pixels..(channel + 1) * pixels]
  }

  pub fn fill(&mut self, value: f32) {
    self.data.fill(value);
  }

  /// 写入一个 8 位 RGB 像素
  pub fn put_rgb(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
    let pixels = self.size * self.size;
    let idx = y * self.size + x;
    for (c, value) in rgb.iter().enumerate() {
      self.data[c * pixels + idx] = *value as f32 / 255.0;
    }
  }
}

impl AsRef<[f32]> for ChwTensor {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for ChwTensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pixels_land_in_channel_planes() {
    let mut tensor = ChwTensor::with_size(2);
    tensor.put_rgb(1, 0, [255, 0, 51]);
    assert_eq!(tensor.shape(), [1, 3, 2, 2]);
    assert_eq!(tensor.plane(0)[1], 1.0);
    assert_eq!(tensor.plane(1)[1], 0.0);
    assert!((tensor.plane(2)[1] - 0.2).abs() < 1e-6);
    assert_eq!(tensor.as_ref().len(), 12);
  }

  #[test]
  fn from_vec_checks_length() {
    assert!(ChwTensor::from_vec(2, vec![0.0; 12]).is_ok());
    assert!(ChwTensor::from_vec(2, vec![0.0; 11]).is_err());
  }
}
