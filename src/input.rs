// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;
use std::path::Path;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 待上传的图像文件
///
/// 原始字节用于 multipart 上传，解码后的像素用于叠加渲染。
pub struct ImageFileInput {
  bytes: Vec<u8>,
  image: RgbImage,
  file_name: String,
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
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let path = url.path();
    let bytes = std::fs::read(path)?;

    // 同一份字节既要上传又要本地解码，避免读两次文件
    let image = ImageReader::new(Cursor::new(&bytes))
      .with_guessed_format()?
      .decode()?
      .into();

    let file_name = Path::new(path)
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());

    Ok(ImageFileInput {
      bytes,
      image,
      file_name,
    })
  }
}

impl ImageFileInput {
  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  /// 原始像素尺寸
  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }
}
