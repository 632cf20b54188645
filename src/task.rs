// 该文件是 Yebing（叶病）项目的一部分。
// src/task.rs - 多轮增强推理的调度与结果汇总
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

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
  augment::{self, AugmentationSpec},
  classify::classify_all,
  config::DetectConfig,
  decode::decode_outputs,
  ensemble::consolidate,
  error::DetectError,
  frame::ChwTensor,
  geometry::{Dims, Letterbox},
  input::Preprocessor,
  model::{BoundingBox, ConsolidatedDetection, InferenceSession, ModelProfile, PassResult},
  nms::suppress,
};

/// 一次检测运行所需的全部外部依赖，由调用方持有
pub struct RunContext<'a, P, S> {
  pub profile: &'a ModelProfile,
  pub config: &'a DetectConfig,
  pub letterbox: Letterbox,
  pub preprocessor: P,
  pub session: S,
}

impl<'a, P: Preprocessor, S: InferenceSession> RunContext<'a, P, S> {
  /// 校验配置并计算 letterbox 参数，任何推理开始前失败
  pub fn new(
    profile: &'a ModelProfile,
    config: &'a DetectConfig,
    display: Dims,
    preprocessor: P,
    session: S,
  ) -> Result<Self, DetectError> {
    profile.validate()?;
    config.validate()?;
    let letterbox = Letterbox::new(preprocessor.original_dims(), profile.input_size, display)?;
    debug!("letterbox 参数: {:?}", letterbox);

    Ok(Self {
      profile,
      config,
      letterbox,
      preprocessor,
      session,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Idle,
  Preprocessing(usize),
  Decoding(usize),
  Failed(usize),
  Consolidating,
  Classifying,
  Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassOutcome {
  Succeeded { boxes: usize },
  Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
  pub augmentation_id: String,
  #[serde(flatten)]
  pub outcome: PassOutcome,
}

/// 面向展示层的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DetectionReport {
  /// 非不确定的结果，最多 `max_detections` 个
  pub confident: Vec<BoundingBox>,
  /// 不确定的结果，不截断
  pub uncertain: Vec<ConsolidatedDetection>,
  pub passes: Vec<PassSummary>,
}

impl DetectionReport {
  pub fn is_empty(&self) -> bool {
    self.confident.is_empty() && self.uncertain.is_empty()
  }

  pub fn succeeded_passes(&self) -> usize {
    self
      .passes
      .iter()
      .filter(|p| matches!(p.outcome, PassOutcome::Succeeded { .. }))
      .count()
  }
}

pub trait Task<P, S>: Sized {
  type Output;
  type Error;
  fn run_task(self, ctx: &mut RunContext<'_, P, S>) -> Result<Self::Output, Self::Error>;
}

struct PassRunner {
  state: RunState,
  tensor: ChwTensor,
}

impl PassRunner {
  fn new(input_size: u32) -> Self {
    let tensor = ChwTensor::with_size(input_size as usize);
    debug!("输入张量: {:?}", tensor.shape());
    Self {
      state: RunState::Idle,
      tensor,
    }
  }

  fn transition(&mut self, next: RunState) {
    debug!("状态: {:?} -> {:?}", self.state, next);
    self.state = next;
  }

  fn run_pass<P: Preprocessor, S: InferenceSession>(
    &mut self,
    ctx: &RunContext<'_, P, S>,
    index: usize,
    spec: &AugmentationSpec,
  ) -> Result<PassResult, DetectError> {
    if !ctx.session.is_available() {
      return Err(DetectError::ModelUnavailable("推理会话已不可用".to_string()));
    }

    self.transition(RunState::Preprocessing(index));
    ctx.preprocessor.prepare(spec, &mut self.tensor)?;
    let outputs = ctx.session.run(spec, &self.tensor)?;

    self.transition(RunState::Decoding(index));
    let candidates = decode_outputs(&outputs, ctx.profile, &ctx.letterbox, ctx.config)?;
    let boxes = suppress(candidates, ctx.config);

    Ok(PassResult {
      augmentation_id: spec.id.to_string(),
      boxes,
    })
  }

  /// 依次执行所有轮次，单轮失败只记录不中断；模型不可用时停止后续轮次
  fn run_passes<P: Preprocessor, S: InferenceSession>(
    &mut self,
    ctx: &RunContext<'_, P, S>,
    specs: &[AugmentationSpec],
  ) -> (Vec<PassResult>, Vec<PassSummary>) {
    let total = specs.len();
    let mut results = Vec::with_capacity(total);
    let mut summaries = Vec::with_capacity(total);

    for (index, spec) in specs.iter().enumerate() {
      info!("处理第 {}/{} 轮 ({})", index + 1, total, spec.id);

      match self.run_pass(ctx, index, spec) {
        Ok(pass) => {
          info!("第 {} 轮 ({}) 保留 {} 个框", index + 1, spec.id, pass.boxes.len());
          summaries.push(PassSummary {
            augmentation_id: spec.id.to_string(),
            outcome: PassOutcome::Succeeded {
              boxes: pass.boxes.len(),
            },
          });
          results.push(pass);
        }
        Err(e) => {
          self.transition(RunState::Failed(index));
          error!("第 {} 轮 ({}) 失败: {}", index + 1, spec.id, e);
          summaries.push(PassSummary {
            augmentation_id: spec.id.to_string(),
            outcome: PassOutcome::Failed {
              reason: e.to_string(),
            },
          });

          if e.is_fatal_to_remaining_passes() {
            for rest in &specs[index + 1..] {
              warn!("跳过 {}: 模型不可用", rest.id);
              summaries.push(PassSummary {
                augmentation_id: rest.id.to_string(),
                outcome: PassOutcome::Failed {
                  reason: e.to_string(),
                },
              });
            }
            break;
          }
        }
      }

      // 让出调度，不影响结果顺序
      if ctx.config.cooperative_yield && index + 1 < total {
        std::thread::yield_now();
      }
    }

    (results, summaries)
  }
}

/// 多轮增强推理 + 投票合并 + 置信度分级
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsembleTask;

impl<P: Preprocessor, S: InferenceSession> Task<P, S> for EnsembleTask {
  type Output = DetectionReport;
  type Error = DetectError;

  fn run_task(self, ctx: &mut RunContext<'_, P, S>) -> Result<Self::Output, Self::Error> {
    let specs = augment::select(ctx.config.pass_budget);
    info!("开始检测: 模型 {}, {} 轮增强", ctx.profile.name, specs.len());

    let mut runner = PassRunner::new(ctx.profile.input_size);
    let (passes, summaries) = runner.run_passes(ctx, specs);

    if passes.is_empty() {
      error!("所有 {} 轮推理均失败", specs.len());
      return Err(DetectError::NoValidPasses {
        attempted: specs.len(),
      });
    }

    runner.transition(RunState::Consolidating);
    info!("合并 {} 轮结果...", passes.len());
    let mut consolidated = consolidate(&passes, ctx.config);

    runner.transition(RunState::Classifying);
    classify_all(&mut consolidated, ctx.config);

    let (uncertain, confident): (Vec<_>, Vec<_>) =
      consolidated.into_iter().partition(|d| d.is_uncertain);
    let mut confident: Vec<BoundingBox> = confident.into_iter().map(|d| d.bbox).collect();
    confident.truncate(ctx.config.max_detections);

    runner.transition(RunState::Done);
    info!(
      "最终结果: {} 个可信, {} 个不确定",
      confident.len(),
      uncertain.len()
    );

    Ok(DetectionReport {
      confident,
      uncertain,
      passes: summaries,
    })
  }
}

/// 仅对原图推理一次，直接返回 NMS 之后的框，不做投票
#[derive(Debug, Default, Clone, Copy)]
pub struct OneShotTask;

impl<P: Preprocessor, S: InferenceSession> Task<P, S> for OneShotTask {
  type Output = DetectionReport;
  type Error = DetectError;

  fn run_task(self, ctx: &mut RunContext<'_, P, S>) -> Result<Self::Output, Self::Error> {
    let specs = augment::select(1);
    info!("开始单次检测: 模型 {}", ctx.profile.name);
    let now = std::time::Instant::now();

    let mut runner = PassRunner::new(ctx.profile.input_size);
    let (mut passes, summaries) = runner.run_passes(ctx, specs);
    let pass = passes.pop().ok_or(DetectError::NoValidPasses { attempted: 1 })?;
    runner.transition(RunState::Done);
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    Ok(DetectionReport {
      confident: pass.boxes,
      uncertain: Vec::new(),
      passes: summaries,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::{
    input::BlankPreprocessor,
    model::{NamedOutputs, SessionError, builtin_profile},
  };

  /// 每次推理返回同一个锚点列表
  struct FixedSession {
    anchors: Vec<[f32; 10]>,
    calls: Cell<usize>,
  }

  impl FixedSession {
    fn new(anchors: Vec<[f32; 10]>) -> Self {
      Self {
        anchors,
        calls: Cell::new(0),
      }
    }
  }

  impl InferenceSession for FixedSession {
    fn run(
      &self,
      _spec: &AugmentationSpec,
      _input: &ChwTensor,
    ) -> Result<NamedOutputs, SessionError> {
      self.calls.set(self.calls.get() + 1);
      let n = 8400;
      let mut data = vec![0.0f32; 10 * n];
      for (i, anchor) in self.anchors.iter().enumerate() {
        for (row, v) in anchor.iter().enumerate() {
          data[row * n + i] = *v;
        }
      }
      Ok(NamedOutputs::new().with("output0", data))
    }
  }

  fn anchor(cx: f32, cy: f32, w: f32, h: f32, class_id: usize, conf: f32) -> [f32; 10] {
    let mut a = [0.0; 10];
    a[..4].copy_from_slice(&[cx, cy, w, h]);
    a[4 + class_id] = conf;
    a
  }

  fn square() -> Dims {
    Dims::new(640.0, 640.0)
  }

  #[test]
  fn repeated_detection_is_confident() {
    let profile = builtin_profile("plant").unwrap();
    let config = DetectConfig::default().with_cooperative_yield(false);
    let session = FixedSession::new(vec![anchor(320.0, 320.0, 100.0, 100.0, 2, 0.8)]);
    let mut ctx = RunContext::new(
      &profile,
      &config,
      square(),
      BlankPreprocessor::new(square()),
      &session,
    )
    .unwrap();

    let report = EnsembleTask.run_task(&mut ctx).unwrap();
    assert_eq!(session.calls.get(), 5);
    assert_eq!(report.confident.len(), 1);
    assert_eq!(report.confident[0].label, "Leaf Scald");
    assert!(report.uncertain.is_empty());
    assert_eq!(report.succeeded_passes(), 5);
  }

  #[test]
  fn single_pass_budget_marks_everything_uncertain() {
    let profile = builtin_profile("rice").unwrap();
    let config = DetectConfig::default().with_pass_budget(1);
    let session = FixedSession::new(vec![anchor(320.0, 320.0, 100.0, 100.0, 0, 0.95)]);
    let mut ctx = RunContext::new(
      &profile,
      &config,
      square(),
      BlankPreprocessor::new(square()),
      &session,
    )
    .unwrap();

    let report = EnsembleTask.run_task(&mut ctx).unwrap();
    assert!(report.confident.is_empty());
    assert_eq!(report.uncertain.len(), 1);
    assert_eq!(report.uncertain[0].votes, 1);
    assert!(report.uncertain[0].is_high_confidence);
  }

  #[test]
  fn one_shot_returns_pass_boxes() {
    let profile = builtin_profile("plant").unwrap();
    let config = DetectConfig::default();
    let session = FixedSession::new(vec![
      anchor(100.0, 100.0, 50.0, 50.0, 1, 0.6),
      anchor(400.0, 400.0, 50.0, 50.0, 5, 0.9),
    ]);
    let mut ctx = RunContext::new(
      &profile,
      &config,
      square(),
      BlankPreprocessor::new(square()),
      &session,
    )
    .unwrap();

    let report = OneShotTask.run_task(&mut ctx).unwrap();
    assert_eq!(session.calls.get(), 1);
    assert_eq!(report.confident.len(), 2);
    assert_eq!(report.confident[0].label, "healthy");
  }

  #[test]
  fn invalid_profile_fails_before_any_pass() {
    let mut profile = builtin_profile("plant").unwrap();
    profile.class_labels.clear();
    let config = DetectConfig::default();
    let session = FixedSession::new(Vec::new());
    let ctx = RunContext::new(
      &profile,
      &config,
      square(),
      BlankPreprocessor::new(square()),
      &session,
    );
    assert!(matches!(ctx, Err(DetectError::InvalidConfiguration(_))));
    assert_eq!(session.calls.get(), 0);
  }
}
