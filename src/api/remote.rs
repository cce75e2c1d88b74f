// 该文件是 Guanlan （观澜） 项目的一部分。
// src/api/remote.rs - 远程检测服务客户端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  api::Predictor,
  model::{HealthStatus, PredictParams, PredictionResult},
};

/// 默认服务地址（本地开发环境）
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PREDICT_FALLBACK_ERROR: &str = "Failed to run detection";
const HEALTH_FALLBACK_ERROR: &str = "Failed to fetch health";

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("服务地址必须使用 http/https 方案: {0}")]
  SchemeMismatch(String),
  #[error("请求超时")]
  Timeout,
  #[error("网络错误: {0}")]
  Network(reqwest::Error),
  #[error("{message}")]
  Server { status: u16, message: String },
  #[error("响应解析错误: {0}")]
  Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ApiError::Timeout
    } else {
      ApiError::Network(err)
    }
  }
}

pub struct RemoteDetectorBuilder {
  base: Url,
  params: PredictParams,
  timeout: Duration,
}

impl FromUrl for RemoteDetectorBuilder {
  type Error = ApiError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != "http" && url.scheme() != "https" {
      return Err(ApiError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(RemoteDetectorBuilder {
      base: url.clone(),
      params: PredictParams::default(),
      timeout: DEFAULT_TIMEOUT,
    })
  }
}

impl RemoteDetectorBuilder {
  pub fn params(mut self, params: PredictParams) -> Self {
    self.params = params;
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<RemoteDetector, ApiError> {
    info!("创建检测服务客户端: {}", self.base);
    let client = Client::builder().timeout(self.timeout).build()?;

    Ok(RemoteDetector {
      base: self.base,
      params: self.params,
      client,
    })
  }
}

/// 远程检测服务客户端
pub struct RemoteDetector {
  base: Url,
  params: PredictParams,
  client: Client,
}

impl RemoteDetector {
  pub fn params(&self) -> &PredictParams {
    &self.params
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
  }

  /// 查询服务健康状态
  pub fn health(&self) -> Result<HealthStatus, ApiError> {
    let resp = self.client.get(self.endpoint("health")).send()?;

    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
      return Err(ApiError::Server {
        status: status.as_u16(),
        message: error_message(&body, HEALTH_FALLBACK_ERROR),
      });
    }

    Ok(serde_json::from_str(&body)?)
  }

  /// 拉取训练指标（原样透传）
  pub fn training_metrics(&self) -> Result<serde_json::Value, ApiError> {
    let resp = self.client.get(self.endpoint("training/metrics")).send()?;

    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
      return Err(ApiError::Server {
        status: status.as_u16(),
        message: error_message(&body, HEALTH_FALLBACK_ERROR),
      });
    }

    Ok(serde_json::from_str(&body)?)
  }

  /// 上传图像并运行检测
  pub fn predict_image(
    &self,
    image: Vec<u8>,
    file_name: &str,
  ) -> Result<PredictionResult, ApiError> {
    debug!("提交图像: {} ({} 字节)", file_name, image.len());

    let part = multipart::Part::bytes(image).file_name(file_name.to_string());
    let form = multipart::Form::new().part("file", part);

    let resp = self
      .client
      .post(self.endpoint("predict"))
      .query(&[
        ("conf", self.params.conf.to_string()),
        ("iou", self.params.iou.to_string()),
        ("imgsz", self.params.imgsz.to_string()),
      ])
      .multipart(form)
      .send()?;

    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
      return Err(ApiError::Server {
        status: status.as_u16(),
        message: error_message(&body, PREDICT_FALLBACK_ERROR),
      });
    }

    Ok(serde_json::from_str(&body)?)
  }
}

impl Predictor for RemoteDetector {
  type Error = ApiError;

  fn predict(&self, image: &[u8], file_name: &str) -> Result<PredictionResult, Self::Error> {
    self.predict_image(image.to_vec(), file_name)
  }
}

// 服务端错误信息优先，无法解析时回退到通用提示
fn error_message(body: &str, fallback: &str) -> String {
  serde_json::from_str::<serde_json::Value>(body)
    .ok()
    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
    .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_message_prefers_server_field() {
    assert_eq!(
      error_message(r#"{"error": "model failed"}"#, PREDICT_FALLBACK_ERROR),
      "model failed"
    );
  }

  #[test]
  fn error_message_falls_back_on_unparseable_body() {
    assert_eq!(
      error_message("<html>502 Bad Gateway</html>", PREDICT_FALLBACK_ERROR),
      "Failed to run detection"
    );
  }

  #[test]
  fn error_message_falls_back_on_missing_field() {
    assert_eq!(
      error_message(r#"{"detail": "nope"}"#, PREDICT_FALLBACK_ERROR),
      "Failed to run detection"
    );
  }

  #[test]
  fn builder_rejects_non_http_scheme() {
    let url = Url::parse("file:///tmp/api").unwrap();
    assert!(matches!(
      RemoteDetectorBuilder::from_url(&url),
      Err(ApiError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn endpoint_joins_without_double_slash() {
    let url = Url::parse("http://localhost:8000/").unwrap();
    let detector = RemoteDetectorBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(detector.endpoint("predict"), "http://localhost:8000/predict");
    assert_eq!(detector.endpoint("health"), "http://localhost:8000/health");
  }
}
