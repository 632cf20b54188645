// 该文件是 Yebing（叶病）项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, geometry::Dims, input::ImagePreprocessor};

/// 单个图像文件的大小上限（10 MiB）
pub const MAX_IMAGE_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image file too large: {0} bytes (max 10 MiB)")]
  TooLarge(u64),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 已解码的 RGB 原图
pub struct ImageFileInput {
  image: RgbImage,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    ImageFileInput::open(url.path())
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    if size > MAX_IMAGE_FILE_BYTES {
      error!("图像文件过大: {} ({} 字节)", path.display(), size);
      return Err(ImageFileInputError::TooLarge(size));
    }

    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!("已加载图像 {}: {}x{}", path.display(), image.width(), image.height());

    Ok(ImageFileInput {
      image: image.into(),
    })
  }

  pub fn dims(&self) -> Dims {
    Dims::new(self.image.width() as f32, self.image.height() as f32)
  }

  /// 按显示尺寸等比缩放后的图像，供结果绘制使用
  pub fn display_image(&self, display: Dims) -> RgbImage {
    let dims = self.dims();
    let scale = (display.width / dims.width).min(display.height / dims.height);
    image::imageops::resize(
      &self.image,
      ((dims.width * scale).round() as u32).max(1),
      ((dims.height * scale).round() as u32).max(1),
      FilterType::Triangle,
    )
  }

  pub fn into_preprocessor(self) -> ImagePreprocessor {
    ImagePreprocessor::from(self.image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn loads_png_and_reports_dims() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.png");
    RgbImage::from_pixel(40, 20, Rgb([10, 200, 30])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.dims(), Dims::new(40.0, 20.0));

    let shown = input.display_image(Dims::new(20.0, 20.0));
    assert_eq!(shown.dimensions(), (20, 10));
  }

  #[test]
  fn rejects_non_image_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"not an image").unwrap();
    assert!(matches!(
      ImageFileInput::open(&path),
      Err(ImageFileInputError::ImageLoadError(_))
    ));
  }

  #[test]
  fn rejects_oversized_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.png");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(MAX_IMAGE_FILE_BYTES + 1).unwrap();
    assert!(matches!(
      ImageFileInput::open(&path),
      Err(ImageFileInputError::TooLarge(_))
    ));
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("file:///tmp/leaf.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
