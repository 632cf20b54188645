// 该文件是 Yebing（叶病）项目的一部分。
// src/output/json_report.rs - 以 JSON 格式输出检测报告
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

use std::{io::Write, path::PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, task::DetectionReport};

#[derive(Error, Debug)]
pub enum JsonReportError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
  Stdout,
  File(PathBuf),
}

/// `json:///path/to/report.json` 或 `json://stdout`
pub struct JsonReportOutput {
  destination: Destination,
}

#[derive(Serialize)]
struct Envelope<'a> {
  generated_at: String,
  #[serde(flatten)]
  report: &'a DetectionReport,
}

impl FromUrlWithScheme for JsonReportOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonReportOutput {
  type Error = JsonReportError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonReportError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let destination = match uri.host_str() {
      Some("stdout") => Destination::Stdout,
      _ => Destination::File(PathBuf::from(uri.path())),
    };
    Ok(JsonReportOutput { destination })
  }
}

impl JsonReportOutput {
  pub fn to_json(report: &DetectionReport) -> Result<String, JsonReportError> {
    let envelope = Envelope {
      generated_at: chrono::Utc::now().to_rfc3339(),
      report,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
  }
}

impl<Frame> Render<Frame, DetectionReport> for JsonReportOutput {
  type Error = JsonReportError;

  fn render_result(&self, _frame: &Frame, result: &DetectionReport) -> Result<(), Self::Error> {
    let json = Self::to_json(result)?;
    match &self.destination {
      Destination::Stdout => {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
      }
      Destination::File(path) => {
        if let Some(parent) = path.parent()
          && !parent.as_os_str().is_empty()
        {
          std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        info!("保存检测报告到文件: {}", path.display());
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    model::{BoundingBox, ConsolidatedDetection},
    task::{PassOutcome, PassSummary},
  };

  fn report() -> DetectionReport {
    let bbox = BoundingBox {
      x: 10.0,
      y: 20.0,
      width: 30.0,
      height: 40.0,
      confidence: 0.6,
      class_id: 3,
      label: "Leaf blast".to_string(),
    };
    DetectionReport {
      confident: vec![bbox.clone()],
      uncertain: vec![ConsolidatedDetection {
        bbox,
        votes: 1,
        avg_confidence: 0.6,
        is_high_confidence: false,
        is_uncertain: true,
      }],
      passes: vec![
        PassSummary {
          augmentation_id: "original".to_string(),
          outcome: PassOutcome::Succeeded { boxes: 1 },
        },
        PassSummary {
          augmentation_id: "rotate_5".to_string(),
          outcome: PassOutcome::Failed {
            reason: "boom".to_string(),
          },
        },
      ],
    }
  }

  #[test]
  fn parses_destinations() {
    let out = JsonReportOutput::from_url(&Url::parse("json://stdout").unwrap()).unwrap();
    assert_eq!(out.destination, Destination::Stdout);

    let out = JsonReportOutput::from_url(&Url::parse("json:///tmp/r.json").unwrap()).unwrap();
    assert_eq!(out.destination, Destination::File(PathBuf::from("/tmp/r.json")));

    assert!(JsonReportOutput::from_url(&Url::parse("image:///tmp/r.png").unwrap()).is_err());
  }

  #[test]
  fn writes_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("report.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let out = JsonReportOutput::from_url(&url).unwrap();
    out.render_result(&(), &report()).unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(value["generated_at"].is_string());
    assert_eq!(value["confident"][0]["label"], "Leaf blast");
    assert_eq!(value["uncertain"][0]["votes"], 1);
    assert_eq!(value["uncertain"][0]["box"]["class_id"], 3);
    assert_eq!(value["passes"][0]["status"], "succeeded");
    assert_eq!(value["passes"][1]["reason"], "boom");
  }
}
