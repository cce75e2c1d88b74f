// 该文件是 Guanlan （观澜） 项目的一部分。
// src/bin/check_health.rs - 服务健康检查
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use guanlan::{FromUrl, api::RemoteDetectorBuilder};

/// Guanlan 服务健康检查
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测服务地址
  #[arg(long, env = "GUANLAN_API_URL", default_value = guanlan::api::DEFAULT_API_URL, value_name = "URL")]
  pub api: Url,

  /// 同时拉取训练指标
  #[arg(long)]
  pub metrics: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测服务地址: {}", args.api);

  let detector = RemoteDetectorBuilder::from_url(&args.api)?.build()?;

  let health = detector.health()?;
  println!("状态: {}", health.status);
  println!("模型: {}", health.model);

  if args.metrics {
    let metrics = detector.training_metrics()?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
  }

  Ok(())
}
