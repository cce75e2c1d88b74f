// 该文件是 Guanlan （观澜） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use guanlan::{
  FromUrl,
  api::RemoteDetectorBuilder,
  controller::{UploadController, UploadState},
  input::ImageFileInput,
  model::{PredictParams, ResultSummary},
  output::{OutputSink, Overlay, Render},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("检测服务地址: {}", args.api);
  info!("输入来源: {}", args.input);
  info!("输出位置: {}", args.output);

  // 创建远程检测器
  let params = PredictParams {
    conf: args.conf,
    iou: args.iou,
    imgsz: args.imgsz,
  };
  let detector = RemoteDetectorBuilder::from_url(&args.api)?
    .params(params)
    .timeout(std::time::Duration::from_secs(args.timeout))
    .build()?;

  // 确认服务可用
  if !args.skip_health {
    let health = detector.health().context("健康检查失败")?;
    info!("服务状态: {} (模型: {})", health.status, health.model);
  }

  // 读取并解码输入图像
  let input = ImageFileInput::from_url(&args.input)?;
  let (width, height) = input.dimensions();
  info!("输入图像: {}x{} ({} 字节)", width, height, input.bytes().len());

  // 构建叠加渲染器与输出
  let mut overlay = Overlay::new(args.max_width);
  if let Some(font) = &args.font {
    overlay = overlay.with_font_file(font)?;
  }
  let output = OutputSink::from_url(&args.output, overlay)?;

  // 控制器驱动一次完整的提交周期
  let mut controller = UploadController::new();
  let generation = controller.select_image(input.bytes().to_vec(), input.file_name());
  controller.image_decoded(generation, width, height);

  info!("开始提交...");
  let now = std::time::Instant::now();
  let state = controller.submit(&detector)?;

  match state {
    UploadState::Success(result) => {
      info!("推理完成，耗时: {:.2?}", now.elapsed());
      output.render_result(input.image(), result)?;

      println!("{}", ResultSummary::of(result));
      for det in &result.detections {
        println!(
          "  - {} {:.1}% at [{:.1}, {:.1}, {:.1}, {:.1}]",
          det.label,
          det.conf * 100.0,
          det.bbox_xyxy[0],
          det.bbox_xyxy[1],
          det.bbox_xyxy[2],
          det.bbox_xyxy[3]
        );
      }
      Ok(())
    }
    UploadState::Error(message) => anyhow::bail!("检测失败: {}", message),
    _ => anyhow::bail!("提交后处于意外状态"),
  }
}
