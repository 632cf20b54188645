// 该文件是 Yebing（叶病）项目的一部分。
// src/input.rs - 图像输入与推理前预处理
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

use crate::{augment::AugmentationSpec, error::DetectError, frame::ChwTensor, geometry::Dims};

/// 将一种增强应用到原图并写入共享的输入张量
///
/// 结果必须保持 letterbox 居中，与 [`crate::geometry::Letterbox`] 的假设一致。
pub trait Preprocessor {
  fn original_dims(&self) -> Dims;
  fn prepare(&self, spec: &AugmentationSpec, tensor: &mut ChwTensor) -> Result<(), DetectError>;
}

impl<P: Preprocessor + ?Sized> Preprocessor for &P {
  fn original_dims(&self) -> Dims {
    (**self).original_dims()
  }

  fn prepare(&self, spec: &AugmentationSpec, tensor: &mut ChwTensor) -> Result<(), DetectError> {
    (**self).prepare(spec, tensor)
  }
}

/// 只知道原图尺寸的预处理器，输出纯白画布
///
/// 用于推理会话不读取输入的场景，例如回放录制的输出。
#[derive(Debug, Clone, Copy)]
pub struct BlankPreprocessor {
  original: Dims,
}

impl BlankPreprocessor {
  pub fn new(original: Dims) -> Self {
    Self { original }
  }
}

impl Preprocessor for BlankPreprocessor {
  fn original_dims(&self) -> Dims {
    self.original
  }

  fn prepare(&self, _spec: &AugmentationSpec, tensor: &mut ChwTensor) -> Result<(), DetectError> {
    tensor.fill(1.0);
    Ok(())
  }
}

#[cfg(feature = "read_image_file")]
mod preprocess;
#[cfg(feature = "read_image_file")]
pub use self::preprocess::ImagePreprocessor;

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, MAX_IMAGE_FILE_BYTES};

#[cfg(test)]
mod tests {
  use super::*;
  use crate::augment::CATALOG;

  #[test]
  fn blank_preprocessor_fills_white() {
    let pre = BlankPreprocessor::new(Dims::new(800.0, 600.0));
    let mut tensor = ChwTensor::with_size(4);
    pre.prepare(&CATALOG[3], &mut tensor).unwrap();
    assert!(tensor.as_ref().iter().all(|v| *v == 1.0));
    assert_eq!(pre.original_dims(), Dims::new(800.0, 600.0));
  }
}
