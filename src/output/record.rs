// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::PredictionResult,
  output::{Overlay, Render},
};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("结果序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 目录记录输出
///
/// 按日期归档叠加图，`record` 查询参数额外保存原始 JSON 结果，
/// `always` 让空结果也落盘。
pub struct RecordOutput {
  directory: PathBuf,
  overlay: Overlay,
  record_json: bool,
  always: bool,
  frame_counter: Arc<Mutex<u16>>,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for RecordOutput {
  type Error = RecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    let record_json = uri.query_pairs().any(|(k, _)| k == "record");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(RecordOutput {
      directory: PathBuf::from(uri.path()),
      overlay: Overlay::default(),
      record_json,
      always,
      frame_counter: Arc::new(Mutex::new(0)),
    })
  }
}

impl RecordOutput {
  pub fn with_overlay(mut self, overlay: Overlay) -> Self {
    self.overlay = overlay;
    self
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counter.lock().unwrap();
    let id = *counter + 1;
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, RecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render for RecordOutput {
  type Error = RecordOutputError;

  fn render_result(&self, image: &RgbImage, result: &PredictionResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.frame_path()?;
    let rendered = self.overlay.render(image, &result.detections);
    rendered.save(&path)?;

    if self.record_json {
      let json = serde_json::to_string_pretty(result)?;
      std::fs::write(path.with_extension("json"), json)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Detection, PredictParams};
  use image::Rgb;

  fn result_with(detections: Vec<Detection>) -> PredictionResult {
    PredictionResult {
      detections,
      params: PredictParams::default(),
    }
  }

  fn count_files(dir: &std::path::Path, ext: &str) -> usize {
    let mut count = 0;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(path) = stack.pop() {
      for entry in std::fs::read_dir(path).unwrap() {
        let entry = entry.unwrap();
        if entry.path().is_dir() {
          stack.push(entry.path());
        } else if entry.path().extension().is_some_and(|e| e == ext) {
          count += 1;
        }
      }
    }
    count
  }

  #[test]
  fn empty_result_is_skipped_without_always() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::parse(&format!("folder:{}", dir.path().display())).unwrap();
    let output = RecordOutput::from_url(&url).unwrap();

    let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    output.render_result(&image, &result_with(vec![])).unwrap();

    assert_eq!(count_files(dir.path(), "png"), 0);
  }

  #[test]
  fn records_image_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::parse(&format!("folder:{}?record&always", dir.path().display())).unwrap();
    let output = RecordOutput::from_url(&url).unwrap();

    let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let result = result_with(vec![Detection {
      label: "bottle".to_string(),
      cls: 39,
      conf: 0.87,
      bbox_xyxy: [1.0, 1.0, 10.0, 10.0],
    }]);
    output.render_result(&image, &result).unwrap();

    assert_eq!(count_files(dir.path(), "png"), 1);
    assert_eq!(count_files(dir.path(), "json"), 1);
  }
}
