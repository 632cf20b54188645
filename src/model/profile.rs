// 该文件是 Yebing（叶病）项目的一部分。
// src/model/profile.rs - 检测模型配置
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

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, error::DetectError};

const DISEASE_LABELS: [&str; 6] = [
  "Brown spot",
  "Leaf Blight",
  "Leaf Scald",
  "Leaf blast",
  "Narrow brown spot",
  "healthy",
];

const YOLO_ANCHOR_COUNT: usize = 8400;
const YOLO_INPUT_SIZE: u32 = 640;

pub const BUILTIN_PROFILES: [&str; 2] = ["plant", "rice"];

fn default_output_names() -> Vec<String> {
  vec!["output0".to_string(), "output".to_string()]
}

/// 检测模型的静态描述，运行前由外部选定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
  pub name: String,
  pub class_labels: Vec<String>,
  pub anchor_count: usize,
  pub input_size: u32,
  /// 按优先级排列的输出张量名称
  #[serde(default = "default_output_names")]
  pub output_names: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ProfileError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未知的内置模型: {0}")]
  UnknownBuiltin(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型配置解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error(transparent)]
  Invalid(#[from] DetectError),
}

/// 内置的 YOLO 叶病模型，两个模型共享同一组类别
pub fn builtin_profile(name: &str) -> Option<ModelProfile> {
  if !BUILTIN_PROFILES.contains(&name) {
    return None;
  }

  Some(ModelProfile {
    name: name.to_string(),
    class_labels: DISEASE_LABELS.iter().map(|s| s.to_string()).collect(),
    anchor_count: YOLO_ANCHOR_COUNT,
    input_size: YOLO_INPUT_SIZE,
    output_names: default_output_names(),
  })
}

impl ModelProfile {
  pub fn num_classes(&self) -> usize {
    self.class_labels.len()
  }

  /// 原始输出期望的元素数量 `(4 + K) * anchor_count`
  pub fn expected_output_len(&self) -> usize {
    (4 + self.num_classes()) * self.anchor_count
  }

  pub fn label(&self, class_id: usize) -> String {
    self
      .class_labels
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| format!("Class {}", class_id))
  }

  pub fn validate(&self) -> Result<(), DetectError> {
    if self.class_labels.is_empty() {
      return Err(DetectError::invalid(format!("模型 {} 的类别列表为空", self.name)));
    }
    let mut seen = HashSet::new();
    for label in &self.class_labels {
      if !seen.insert(label.as_str()) {
        return Err(DetectError::invalid(format!(
          "模型 {} 的类别重复: {}",
          self.name, label
        )));
      }
    }
    if self.anchor_count == 0 {
      return Err(DetectError::invalid(format!("模型 {} 的锚点数量为 0", self.name)));
    }
    if self.input_size == 0 {
      return Err(DetectError::invalid(format!("模型 {} 的输入尺寸为 0", self.name)));
    }
    if self.output_names.is_empty() {
      return Err(DetectError::invalid(format!("模型 {} 未声明输出名称", self.name)));
    }
    Ok(())
  }
}

const BUILTIN_SCHEME: &str = "builtin";
const PROFILE_SCHEME: &str = "profile";

impl FromUrl for ModelProfile {
  type Error = ProfileError;

  /// `builtin://plant` 或 `profile:///path/to/profile.json`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let profile = match url.scheme() {
      BUILTIN_SCHEME => {
        let name = url.host_str().unwrap_or_default();
        builtin_profile(name).ok_or_else(|| ProfileError::UnknownBuiltin(name.to_string()))?
      }
      PROFILE_SCHEME => {
        info!("加载模型配置文件: {}", url.path());
        let text = std::fs::read_to_string(url.path())?;
        serde_json::from_str(&text)?
      }
      other => {
        error!(
          "URI scheme mismatch: expected '{}' or '{}', found '{}'",
          BUILTIN_SCHEME, PROFILE_SCHEME, other
        );
        return Err(ProfileError::SchemeMismatch(other.to_string()));
      }
    };

    profile.validate()?;
    debug!(
      "模型 {}: {} 个类别, {} 个锚点, 输入 {}x{}",
      profile.name,
      profile.num_classes(),
      profile.anchor_count,
      profile.input_size,
      profile.input_size
    );
    Ok(profile)
  }
}
