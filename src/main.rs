// 该文件是 Yebing（叶病）项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Result, anyhow};
use clap::Parser;
use image::{Rgb, RgbImage};
use tracing::info;

use yebing::{
  FromUrl,
  config::DetectConfig,
  geometry::Dims,
  input::{BlankPreprocessor, ImageFileInput, Preprocessor},
  model::{ModelProfile, ReplaySession},
  output::{OutputWrapper, Render},
  task::{DetectionReport, EnsembleTask, OneShotTask, RunContext, Task},
};

fn detect<P: Preprocessor>(
  args: &args::Args,
  profile: &ModelProfile,
  config: &DetectConfig,
  display: Dims,
  preprocessor: P,
  session: &ReplaySession,
) -> Result<DetectionReport> {
  let mut ctx = RunContext::new(profile, config, display, preprocessor, session)?;

  let now = std::time::Instant::now();
  let report = if args.single_pass {
    OneShotTask.run_task(&mut ctx)?
  } else {
    EnsembleTask.run_task(&mut ctx)?
  };
  info!("检测完成，耗时: {:.2?}", now.elapsed());

  Ok(report)
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("推理会话: {}", args.session);

  let profile = ModelProfile::from_url(&args.model)?;
  let mut config = match &args.config {
    Some(path) => DetectConfig::from_json_file(path)?,
    None => DetectConfig::default(),
  };
  if let Some(passes) = args.passes {
    config = config.with_pass_budget(passes);
  }

  let session = ReplaySession::from_url(&args.session)?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let (report, frame) = match &args.input {
    Some(url) => {
      info!("输入来源: {}", url);
      let input = ImageFileInput::from_url(url)?;
      let display = args.display.unwrap_or(input.dims());
      let frame = input.display_image(display);
      let report = detect(&args, &profile, &config, display, input.into_preprocessor(), &session)?;
      (report, frame)
    }
    None => {
      let original = args
        .original
        .ok_or_else(|| anyhow!("未提供输入图像时必须指定 --original"))?;
      let display = args.display.unwrap_or(original);
      let frame = RgbImage::from_pixel(
        display.width.round() as u32,
        display.height.round() as u32,
        Rgb([255, 255, 255]),
      );
      let report = detect(
        &args,
        &profile,
        &config,
        display,
        BlankPreprocessor::new(original),
        &session,
      )?;
      (report, frame)
    }
  };

  for bbox in report.confident.iter() {
    info!(
      "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
      bbox.label,
      bbox.confidence * 100.0,
      bbox.x,
      bbox.y,
      bbox.width,
      bbox.height
    );
  }
  for detection in report.uncertain.iter() {
    info!(
      "  ? {}: {:.2}% ({} 票)",
      detection.bbox.label,
      detection.avg_confidence * 100.0,
      detection.votes
    );
  }

  for output in outputs.iter() {
    output.render_result(&frame, &report)?;
  }

  Ok(())
}
