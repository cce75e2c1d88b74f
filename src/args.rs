// 该文件是 Guanlan （观澜） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use guanlan::api::DEFAULT_API_URL;

/// Guanlan 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测服务地址
  #[arg(long, env = "GUANLAN_API_URL", default_value = DEFAULT_API_URL, value_name = "URL")]
  pub api: Url,

  /// 输入图像（image:/path/to/file.jpg）
  /// 支持格式: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出位置
  /// 支持格式:
  /// - 图片: image:/path/out.png
  /// - 目录记录: folder:/path/dir?record&always
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub conf: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 推理输入尺寸
  #[arg(long, default_value = "640", value_name = "SIZE")]
  pub imgsz: u32,

  /// 显示宽度上限（只缩小，不放大）
  #[arg(long, default_value = "800", value_name = "WIDTH")]
  pub max_width: u32,

  /// 标签字体文件路径
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 网络请求超时（秒）
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout: u64,

  /// 跳过启动时的健康检查
  #[arg(long)]
  pub skip_health: bool,
}
