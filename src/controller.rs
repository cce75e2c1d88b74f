// 该文件是 Guanlan （观澜） 项目的一部分。
// src/controller.rs - 上传提交控制器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{api::Predictor, model::PredictionResult};

/// 上传状态机
///
/// Idle → Loading → Success / Error，选择新图像后回到 Idle。
/// 不支持 Loading → Idle 的取消路径。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadState {
  #[default]
  Idle,
  Loading,
  Success(PredictionResult),
  Error(String),
}

impl UploadState {
  pub fn is_idle(&self) -> bool {
    matches!(self, UploadState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, UploadState::Loading)
  }

  pub fn result(&self) -> Option<&PredictionResult> {
    match self {
      UploadState::Success(result) => Some(result),
      _ => None,
    }
  }
}

/// 当前选中的图像
#[derive(Debug, Clone)]
pub struct SelectedImage {
  data: Vec<u8>,
  file_name: String,
  dimensions: Option<(u32, u32)>,
  generation: u64,
}

impl SelectedImage {
  pub fn data(&self) -> &[u8] {
    &self.data
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  /// 原始像素尺寸；解码完成前为 None
  pub fn dimensions(&self) -> Option<(u32, u32)> {
    self.dimensions
  }

  pub fn is_decoded(&self) -> bool {
    self.dimensions.is_some()
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
  #[error("未选择图像")]
  NoImageSelected,
  #[error("已有请求在处理中")]
  RequestInFlight,
}

/// 上传提交控制器：持有当前图像，驱动一次完整的提交周期
#[derive(Debug, Default)]
pub struct UploadController {
  selected: Option<SelectedImage>,
  state: UploadState,
  generation: u64,
}

impl UploadController {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &UploadState {
    &self.state
  }

  pub fn selected(&self) -> Option<&SelectedImage> {
    self.selected.as_ref()
  }

  /// 选择新图像：替换旧图像，丢弃旧结果，回到空闲状态
  pub fn select_image(&mut self, data: Vec<u8>, file_name: impl Into<String>) -> u64 {
    self.generation += 1;
    debug!("选择新图像 (第 {} 代)", self.generation);

    // 旧图像与旧结果一并丢弃
    self.selected = Some(SelectedImage {
      data,
      file_name: file_name.into(),
      dimensions: None,
      generation: self.generation,
    });
    self.state = UploadState::Idle;

    self.generation
  }

  /// 解码完成回调；过期代次的结果直接忽略
  pub fn image_decoded(&mut self, generation: u64, width: u32, height: u32) -> bool {
    if generation != self.generation {
      debug!(
        "忽略过期的解码结果 (第 {} 代, 当前第 {} 代)",
        generation, self.generation
      );
      return false;
    }

    match self.selected.as_mut() {
      Some(image) => {
        image.dimensions = Some((width, height));
        true
      }
      None => false,
    }
  }

  /// 检查前置条件并进入 Loading 状态
  ///
  /// 同一时间只允许一个未完成的请求；Loading 期间的再次提交被显式拒绝。
  pub fn begin_submit(&mut self) -> Result<&SelectedImage, SubmitError> {
    if self.state.is_loading() {
      return Err(SubmitError::RequestInFlight);
    }
    if self.selected.is_some() {
      self.state = UploadState::Loading;
    }
    self.selected.as_ref().ok_or(SubmitError::NoImageSelected)
  }

  /// 推理成功，Loading → Success
  pub fn complete(&mut self, result: PredictionResult) {
    info!("推理完成: 检测到 {} 个对象", result.detections.len());
    self.state = UploadState::Success(result);
  }

  /// 推理失败，Loading → Error
  pub fn fail(&mut self, message: impl Into<String>) {
    let message = message.into();
    warn!("推理失败: {}", message);
    self.state = UploadState::Error(message);
  }

  /// 完整提交周期
  ///
  /// 网络与服务端失败被吸收为 Error 状态；NoImageSelected 与
  /// RequestInFlight 在发出任何请求之前返回。
  pub fn submit<P>(&mut self, predictor: &P) -> Result<&UploadState, SubmitError>
  where
    P: Predictor,
    P::Error: std::fmt::Display,
  {
    let (data, file_name) = {
      let image = self.begin_submit()?;
      (image.data.clone(), image.file_name.clone())
    };

    match predictor.predict(&data, &file_name) {
      Ok(result) => self.complete(result),
      Err(err) => self.fail(err.to_string()),
    }

    Ok(&self.state)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::model::{Detection, PredictParams};

  struct StubPredictor {
    calls: Cell<usize>,
    response: Result<PredictionResult, String>,
  }

  impl StubPredictor {
    fn success(result: PredictionResult) -> Self {
      StubPredictor {
        calls: Cell::new(0),
        response: Ok(result),
      }
    }

    fn failure(message: &str) -> Self {
      StubPredictor {
        calls: Cell::new(0),
        response: Err(message.to_string()),
      }
    }
  }

  impl Predictor for StubPredictor {
    type Error = String;

    fn predict(&self, _image: &[u8], _file_name: &str) -> Result<PredictionResult, Self::Error> {
      self.calls.set(self.calls.get() + 1);
      self.response.clone()
    }
  }

  fn one_bottle() -> PredictionResult {
    PredictionResult {
      detections: vec![Detection {
        label: "bottle".to_string(),
        cls: 39,
        conf: 0.87,
        bbox_xyxy: [10.0, 10.0, 50.0, 50.0],
      }],
      params: PredictParams::default(),
    }
  }

  #[test]
  fn submit_without_image_never_calls_predictor() {
    let mut controller = UploadController::new();
    let stub = StubPredictor::success(one_bottle());

    assert_eq!(controller.submit(&stub), Err(SubmitError::NoImageSelected));
    assert_eq!(stub.calls.get(), 0);
    assert!(controller.state().is_idle());
  }

  #[test]
  fn submit_success_transitions_to_success() {
    let mut controller = UploadController::new();
    let stub = StubPredictor::success(one_bottle());

    controller.select_image(vec![1, 2, 3], "demo.jpg");
    let state = controller.submit(&stub).unwrap();

    let result = state.result().expect("expected Success state");
    assert_eq!(result.detections[0].label, "bottle");
    assert_eq!(stub.calls.get(), 1);
  }

  #[test]
  fn submit_failure_carries_server_message() {
    let mut controller = UploadController::new();
    let stub = StubPredictor::failure("model failed");

    controller.select_image(vec![1, 2, 3], "demo.jpg");
    controller.submit(&stub).unwrap();

    match controller.state() {
      UploadState::Error(message) => assert_eq!(message, "model failed"),
      other => panic!("expected Error state, got {:?}", other),
    }
  }

  #[test]
  fn submit_while_loading_is_rejected() {
    let mut controller = UploadController::new();
    let stub = StubPredictor::success(one_bottle());

    controller.select_image(vec![1, 2, 3], "demo.jpg");
    controller.begin_submit().unwrap();
    assert!(controller.state().is_loading());

    assert_eq!(controller.submit(&stub), Err(SubmitError::RequestInFlight));
    assert_eq!(stub.calls.get(), 0);
  }

  #[test]
  fn new_selection_clears_previous_result() {
    let mut controller = UploadController::new();
    let stub = StubPredictor::success(one_bottle());

    controller.select_image(vec![1, 2, 3], "first.jpg");
    controller.submit(&stub).unwrap();
    assert!(controller.state().result().is_some());

    controller.select_image(vec![4, 5, 6], "second.jpg");
    assert!(controller.state().is_idle());
    assert_eq!(controller.selected().unwrap().data(), &[4, 5, 6]);
    assert_eq!(controller.selected().unwrap().file_name(), "second.jpg");
  }

  #[test]
  fn stale_decode_is_ignored() {
    let mut controller = UploadController::new();

    let first = controller.select_image(vec![1], "first.jpg");
    let second = controller.select_image(vec![2], "second.jpg");

    assert!(!controller.image_decoded(first, 640, 480));
    assert!(!controller.selected().unwrap().is_decoded());

    assert!(controller.image_decoded(second, 800, 600));
    assert_eq!(controller.selected().unwrap().dimensions(), Some((800, 600)));
  }

  #[test]
  fn failure_then_new_selection_allows_retry() {
    let mut controller = UploadController::new();

    controller.select_image(vec![1], "demo.jpg");
    controller.submit(&StubPredictor::failure("boom")).unwrap();
    assert!(matches!(controller.state(), UploadState::Error(_)));

    // 失败后不需要重新选择也可以直接重试
    let state = controller.submit(&StubPredictor::success(one_bottle())).unwrap();
    assert!(state.result().is_some());
  }
}
