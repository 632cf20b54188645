// 该文件是 Yebing（叶病）项目的一部分。
// src/error.rs - 检测流程错误定义
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

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
  /// 配置错误，在任何推理轮次开始前即终止
  #[error("配置无效: {0}")]
  InvalidConfiguration(String),
  /// 模型输出与模型配置不符，当前轮次被跳过
  #[error("模型输出格式错误: {0}")]
  MalformedOutput(String),
  /// 推理会话不可用，当前及后续轮次全部失败
  #[error("模型不可用: {0}")]
  ModelUnavailable(String),
  /// 没有任何一轮推理成功
  #[error("所有 {attempted} 轮推理均失败")]
  NoValidPasses { attempted: usize },
  #[error("预处理失败: {0}")]
  Preprocess(String),
  #[error("推理失败: {0}")]
  Inference(String),
}

impl DetectError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    DetectError::InvalidConfiguration(msg.into())
  }

  pub fn malformed(msg: impl Into<String>) -> Self {
    DetectError::MalformedOutput(msg.into())
  }

  /// 该错误是否终止剩余的推理轮次
  pub fn is_fatal_to_remaining_passes(&self) -> bool {
    matches!(self, DetectError::ModelUnavailable(_))
  }
}
