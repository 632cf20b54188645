// 该文件是 Yebing（叶病）项目的一部分。
// src/model/session.rs - 推理会话接口
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

use std::collections::HashMap;

use thiserror::Error;

use crate::{augment::AugmentationSpec, error::DetectError, frame::ChwTensor, model::ModelProfile};

/// 一个输出张量的扁平数据
///
/// 逻辑上是行主序矩阵，行为 `[cx, cy, w, h, class_0..class_{K-1}]`，列为锚点。
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
  pub data: Box<[f32]>,
}

impl From<Vec<f32>> for RawOutput {
  fn from(data: Vec<f32>) -> Self {
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl RawOutput {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

/// 按名称索引的输出张量集合
#[derive(Debug, Clone, Default)]
pub struct NamedOutputs {
  tensors: HashMap<String, RawOutput>,
}

impl NamedOutputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: impl Into<String>, output: impl Into<RawOutput>) -> Self {
    self.insert(name, output);
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, output: impl Into<RawOutput>) {
    self.tensors.insert(name.into(), output.into());
  }

  pub fn get(&self, name: &str) -> Option<&RawOutput> {
    self.tensors.get(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.tensors.keys().map(String::as_str)
  }

  /// 按模型声明的名称顺序查找输出，找不到即视为输出格式错误
  pub fn select<'a>(
    &'a self,
    profile: &'a ModelProfile,
  ) -> Result<(&'a str, &'a RawOutput), DetectError> {
    profile
      .output_names
      .iter()
      .find_map(|name| self.tensors.get(name).map(|t| (name.as_str(), t)))
      .ok_or_else(|| {
        let mut found: Vec<_> = self.names().collect();
        found.sort_unstable();
        DetectError::malformed(format!(
          "未找到期望的输出 {:?}, 实际输出 {:?}",
          profile.output_names, found
        ))
      })
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
  /// 会话已释放或模型未加载
  #[error("会话不可用: {0}")]
  Unavailable(String),
  #[error("推理执行失败: {0}")]
  Failed(String),
}

impl From<SessionError> for DetectError {
  fn from(err: SessionError) -> Self {
    match err {
      SessionError::Unavailable(msg) => DetectError::ModelUnavailable(msg),
      SessionError::Failed(msg) => DetectError::Inference(msg),
    }
  }
}

/// 外部推理引擎的抽象，会话的生命周期由调用方管理
pub trait InferenceSession {
  fn is_available(&self) -> bool {
    true
  }

  /// 对 1x3xSxS 的输入执行一次前向推理，`spec` 为生成该输入的增强
  fn run(&self, spec: &AugmentationSpec, input: &ChwTensor) -> Result<NamedOutputs, SessionError>;
}

impl<S: InferenceSession + ?Sized> InferenceSession for &S {
  fn is_available(&self) -> bool {
    (**self).is_available()
  }

  fn run(&self, spec: &AugmentationSpec, input: &ChwTensor) -> Result<NamedOutputs, SessionError> {
    (**self).run(spec, input)
  }
}
