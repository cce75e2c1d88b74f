// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::PredictionResult};

mod draw;
mod record;
mod save_image_file;

pub use self::draw::{DEFAULT_MAX_DISPLAY_WIDTH, Overlay, OverlayError, label_text};
pub use self::record::{RecordOutput, RecordOutputError};
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

/// 渲染输出定义
pub trait Render {
  type Error;

  fn render_result(&self, image: &RgbImage, result: &PredictionResult) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("图像输出错误: {0}")]
  File(#[from] SaveImageFileError),
  #[error("目录记录错误: {0}")]
  Record(#[from] RecordOutputError),
  #[error("不支持的输出方案: {0}")]
  UnsupportedScheme(String),
}

/// 按 URL 方案分发的输出
pub enum OutputSink {
  File(SaveImageFileOutput),
  Record(RecordOutput),
}

impl OutputSink {
  pub fn from_url(url: &Url, overlay: Overlay) -> Result<Self, OutputError> {
    match url.scheme() {
      scheme if scheme == SaveImageFileOutput::SCHEME => Ok(OutputSink::File(
        SaveImageFileOutput::from_url(url)?.with_overlay(overlay),
      )),
      scheme if scheme == RecordOutput::SCHEME => Ok(OutputSink::Record(
        RecordOutput::from_url(url)?.with_overlay(overlay),
      )),
      other => Err(OutputError::UnsupportedScheme(other.to_string())),
    }
  }
}

impl Render for OutputSink {
  type Error = OutputError;

  fn render_result(&self, image: &RgbImage, result: &PredictionResult) -> Result<(), Self::Error> {
    match self {
      OutputSink::File(output) => output.render_result(image, result)?,
      OutputSink::Record(output) => output.render_result(image, result)?,
    }
    Ok(())
  }
}
