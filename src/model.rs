// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model.rs - 检测结果数据模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::{Deserialize, Serialize};

/// 单个检测目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  /// 类别名称
  pub label: String,
  /// 类别编号
  pub cls: u32,
  /// 置信度 (0.0 - 1.0)
  pub conf: f32,
  /// 边界框 [x_min, y_min, x_max, y_max]，原图像素坐标
  pub bbox_xyxy: [f32; 4],
}

/// 推理参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictParams {
  pub conf: f32,
  pub iou: f32,
  pub imgsz: u32,
}

impl Default for PredictParams {
  fn default() -> Self {
    Self {
      conf: 0.25,
      iou: 0.45,
      imgsz: 640,
    }
  }
}

/// 一次推理的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
  pub detections: Vec<Detection>,
  pub params: PredictParams,
}

impl PredictionResult {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 服务健康状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
  pub status: String,
  pub model: String,
}

/// 检测结果摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
  pub detected: usize,
  pub labels: String,
  pub confidence: String,
}

impl ResultSummary {
  pub fn of(result: &PredictionResult) -> Self {
    let detected = result.detections.len();

    let labels = if detected == 0 {
      "None".to_string()
    } else {
      // 去重并保留首次出现的顺序
      let mut seen: Vec<&str> = Vec::new();
      for det in &result.detections {
        if !seen.contains(&det.label.as_str()) {
          seen.push(det.label.as_str());
        }
      }
      seen.join(", ")
    };

    let confidence = if detected == 0 {
      "0%".to_string()
    } else {
      let mut min = f32::MAX;
      let mut max = f32::MIN;
      for det in &result.detections {
        min = min.min(det.conf);
        max = max.max(det.conf);
      }
      if detected == 1 {
        format!("{:.1}%", max * 100.0)
      } else {
        format!("{:.1}% - {:.1}%", min * 100.0, max * 100.0)
      }
    };

    ResultSummary {
      detected,
      labels,
      confidence,
    }
  }
}

impl std::fmt::Display for ResultSummary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{} detected, labels: {}, confidence {}",
      self.detected, self.labels, self.confidence
    )
  }
}
