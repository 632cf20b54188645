// 该文件是 Yebing（叶病）项目的一部分。
// src/model/replay.rs - 回放预先录制的模型输出
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

use std::{
  cell::Cell,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  augment::AugmentationSpec,
  frame::ChwTensor,
  model::{InferenceSession, NamedOutputs, RawOutput, SessionError},
};

const REPLAY_FILE_EXTENSION: &str = "f32";

#[derive(Error, Debug)]
pub enum ReplaySessionError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("回放目录不存在: {0}")]
  MissingDirectory(PathBuf),
}

/// 从目录中按增强回放原始输出
///
/// 每次推理读取 `<增强 id>.f32`，内容为小端序 f32 数组，
/// 作为名为 `output_name` 的输出返回。输入张量被忽略。
pub struct ReplaySession {
  directory: PathBuf,
  output_name: String,
  released: Cell<bool>,
}

impl FromUrlWithScheme for ReplaySession {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplaySession {
  type Error = ReplaySessionError;

  /// `replay:///path/to/dir?output=output0`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplaySessionError::SchemeMismatch);
    }

    let output_name = url
      .query_pairs()
      .find(|(k, _)| k == "output")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| "output0".to_string());

    ReplaySession::open(url.path(), output_name)
  }
}

impl ReplaySession {
  pub fn open(
    directory: impl AsRef<Path>,
    output_name: impl Into<String>,
  ) -> Result<Self, ReplaySessionError> {
    let directory = directory.as_ref().to_path_buf();
    if !directory.is_dir() {
      return Err(ReplaySessionError::MissingDirectory(directory));
    }

    Ok(Self {
      directory,
      output_name: output_name.into(),
      released: Cell::new(false),
    })
  }

  /// 释放会话，之后的推理全部返回 `Unavailable`
  pub fn release(&self) {
    self.released.set(true);
  }

  pub fn file_for(&self, augmentation_id: &str) -> PathBuf {
    self
      .directory
      .join(format!("{}.{}", augmentation_id, REPLAY_FILE_EXTENSION))
  }

  /// 将原始输出写成回放文件
  pub fn record(path: impl AsRef<Path>, output: &[f32]) -> std::io::Result<()> {
    let bytes: Vec<u8> = output.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes)
  }

  fn load(&self, path: &Path) -> Result<RawOutput, SessionError> {
    let bytes = std::fs::read(path)
      .map_err(|e| SessionError::Failed(format!("无法读取 {}: {}", path.display(), e)))?;
    if bytes.len() % 4 != 0 {
      return Err(SessionError::Failed(format!(
        "{} 的字节数 {} 不是 4 的倍数",
        path.display(),
        bytes.len()
      )));
    }

    let data: Vec<f32> = bytes
      .chunks_exact(4)
      .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect();
    Ok(RawOutput::from(data))
  }
}

impl InferenceSession for ReplaySession {
  fn is_available(&self) -> bool {
    !self.released.get()
  }

  fn run(&self, spec: &AugmentationSpec, _input: &ChwTensor) -> Result<NamedOutputs, SessionError> {
    if self.released.get() {
      return Err(SessionError::Unavailable("回放会话已释放".to_string()));
    }

    let path = self.file_for(spec.id);
    if !path.exists() {
      warn!("回放文件不存在: {}", path.display());
      return Err(SessionError::Failed(format!("缺少回放文件 {}", path.display())));
    }

    let output = self.load(&path)?;
    debug!("回放 {}: {} 个元素", path.display(), output.len());
    Ok(NamedOutputs::new().with(self.output_name.clone(), output))
  }
}
