// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/draw.rs - 检测结果叠加渲染
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::warn;

use crate::model::Detection;

/// 默认显示宽度上限
pub const DEFAULT_MAX_DISPLAY_WIDTH: u32 = 800;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_TEXT_HEIGHT: i32 = 25;
const LABEL_CHAR_WIDTH: f32 = 10.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_PADDING: i32 = 5;
const BOX_THICKNESS: i32 = 3;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const PLAQUETTE_COLOR: [u8; 3] = [245, 245, 245];

#[derive(Error, Debug)]
pub enum OverlayError {
  #[error("字体文件读取失败: {0}")]
  FontIo(#[from] std::io::Error),
  #[error("字体解析失败")]
  FontInvalid,
}

/// 检测结果叠加渲染器
///
/// 把原图缩放到显示宽度以内（只缩小，不放大），再按同一缩放
/// 系数画出所有检测框与标签。
pub struct Overlay {
  max_display_width: u32,
  font: Option<FontArc>,
  font_scale: PxScale,
  label_text_height: i32,
  label_char_width: f32,
  box_color: Rgb<u8>,
  plaquette_color: Rgb<u8>,
}

impl Default for Overlay {
  fn default() -> Self {
    Self {
      max_display_width: DEFAULT_MAX_DISPLAY_WIDTH,
      font: None,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      box_color: Rgb(BOX_COLOR),
      plaquette_color: Rgb(PLAQUETTE_COLOR),
    }
  }
}

impl Overlay {
  pub fn new(max_display_width: u32) -> Self {
    Self {
      max_display_width: max_display_width.max(1),
      ..Self::default()
    }
  }

  /// 从文件加载标签字体
  pub fn with_font_file(self, path: &std::path::Path) -> Result<Self, OverlayError> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data).map_err(|_| OverlayError::FontInvalid)?;
    Ok(self.with_font(font))
  }

  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn max_display_width(&self) -> u32 {
    self.max_display_width
  }

  /// 统一缩放系数：min(1, 显示宽度上限 / 原图宽度)
  pub fn scale_for(&self, natural_width: u32) -> f32 {
    if natural_width == 0 {
      return 1.0;
    }
    (self.max_display_width as f32 / natural_width as f32).min(1.0)
  }

  /// 渲染叠加图
  ///
  /// 零个检测时只输出缩放后的原图；渲染不依赖检测顺序。
  pub fn render(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let (natural_w, natural_h) = image.dimensions();
    let scale = self.scale_for(natural_w);

    // 输出尺寸与框坐标用同一种截断取整，避免视觉漂移
    let display_w = ((natural_w as f32 * scale) as u32).max(1);
    let display_h = ((natural_h as f32 * scale) as u32).max(1);

    let mut canvas = if (display_w, display_h) == (natural_w, natural_h) {
      image.clone()
    } else {
      imageops::resize(image, display_w, display_h, imageops::FilterType::Triangle)
    };

    if self.font.is_none() && !detections.is_empty() {
      warn!("未加载字体，标签文本将被省略");
    }

    for det in detections {
      self.draw_detection(&mut canvas, det, scale);
    }

    canvas
  }

  fn draw_detection(&self, canvas: &mut RgbImage, det: &Detection, scale: f32) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    let [bx1, by1, bx2, by2] = scaled_bbox(&det.bbox_xyxy, scale);

    let x1 = bx1.clamp(0, w - 1);
    let y1 = by1.clamp(0, h - 1);
    let x2 = bx2.clamp(0, w - 1);
    let y2 = by2.clamp(0, h - 1);

    // 退化框（零或负尺寸）不画框体，只画标签
    let box_w = (x2 - x1).max(0) as u32;
    let box_h = (y2 - y1).max(0) as u32;

    if box_w > 0 && box_h > 0 {
      // 多画几圈空心矩形来加粗边框
      for t in 0..BOX_THICKNESS {
        let inner_w = box_w.saturating_sub(2 * t as u32);
        let inner_h = box_h.saturating_sub(2 * t as u32);
        if inner_w == 0 || inner_h == 0 {
          break;
        }
        let rect = Rect::at(x1 + t, y1 + t).of_size(inner_w, inner_h);
        draw_hollow_rect_mut(canvas, rect, self.box_color);
      }
    }

    self.draw_label(canvas, det, x1, y1);
  }

  fn draw_label(&self, canvas: &mut RgbImage, det: &Detection, x1: i32, y1: i32) {
    let label = label_text(det);

    // 估算文本宽度（粗略估计）
    let text_width = (label.len() as f32 * self.label_char_width) as i32;
    let label_x = x1.max(0);
    let label_y = label_origin(y1, self.label_text_height);

    // 确保标签不超出画布边界
    let max_width = (canvas.width() as i32 - label_x).max(0);
    let plaquette_w = text_width.min(max_width);
    if plaquette_w <= 0 {
      return;
    }

    let rect = Rect::at(label_x, label_y).of_size(plaquette_w as u32, self.label_text_height as u32);
    draw_filled_rect_mut(canvas, rect, self.plaquette_color);

    if let Some(font) = &self.font {
      draw_text_mut(
        canvas,
        self.box_color,
        label_x + LABEL_TEXT_PADDING,
        label_y + 2,
        self.font_scale,
        font,
        &label,
      );
    }
  }
}

/// 标签文本，如 "bottle 87.0%"
pub fn label_text(det: &Detection) -> String {
  format!("{} {:.1}%", det.label, det.conf * 100.0)
}

/// 框坐标缩放，与画布尺寸使用同一截断策略
pub fn scaled_bbox(bbox: &[f32; 4], scale: f32) -> [i32; 4] {
  [
    (bbox[0] * scale) as i32,
    (bbox[1] * scale) as i32,
    (bbox[2] * scale) as i32,
    (bbox[3] * scale) as i32,
  ]
}

/// 标签位置：默认在框上沿之上，贴近画布顶端时移到框上沿之下
pub fn label_origin(y1: i32, label_height: i32) -> i32 {
  if y1 >= label_height {
    y1 - label_height
  } else {
    y1.max(0)
  }
}
