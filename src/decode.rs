// 该文件是 Yebing（叶病）项目的一部分。
// src/decode.rs - 将原始输出张量解码为显示空间检测框
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

use tracing::{debug, error};

use crate::{
  config::DetectConfig,
  error::DetectError,
  geometry::Letterbox,
  model::{BoundingBox, ModelProfile, NamedOutputs, RawOutput},
};

/// 在所有类别行中找出最大置信度及其类别
///
/// 置信度从 0 起比较，相同取值保留靠前的类别。
fn argmax_class(data: &[f32], num_classes: usize, anchors: usize, idx: usize) -> (f32, usize) {
  let mut max_conf = 0.0f32;
  let mut class_id = 0usize;
  for c in 0..num_classes {
    let conf = data[(4 + c) * anchors + idx];
    if conf > max_conf {
      max_conf = conf;
      class_id = c;
    }
  }
  (max_conf, class_id)
}

/// 解码单个输出张量，返回 NMS 之前的候选框
///
/// 数据按通道优先排列：先是所有锚点的 cx，然后是 cy、w、h，再是各类别置信度。
pub fn decode(
  raw: &RawOutput,
  profile: &ModelProfile,
  letterbox: &Letterbox,
  config: &DetectConfig,
) -> Result<Vec<BoundingBox>, DetectError> {
  let anchors = profile.anchor_count;
  let num_classes = profile.num_classes();
  let expected = profile.expected_output_len();

  if raw.len() != expected {
    error!(
      "输出长度不匹配: 期望 (4 + {}) * {} = {}, 实际 {}",
      num_classes,
      anchors,
      expected,
      raw.len()
    );
    return Err(DetectError::malformed(format!(
      "输出长度应为 {}, 实际为 {}",
      expected,
      raw.len()
    )));
  }

  let data = &raw.data;
  let display = letterbox.display;
  let mut detections = Vec::new();

  for i in 0..anchors {
    let cx = data[i];
    let cy = data[anchors + i];
    let w = data[2 * anchors + i];
    let h = data[3 * anchors + i];

    let (max_conf, class_id) = argmax_class(data, num_classes, anchors, i);
    if !(max_conf > config.confidence_threshold && max_conf <= 1.0 && w > 0.0 && h > 0.0) {
      continue;
    }

    let [dx, dy, dw, dh] = letterbox.center_box_to_display(cx, cy, w, h);
    let x = dx.max(0.0);
    let y = dy.max(0.0);
    let width = dw.min(display.width - x);
    let height = dh.min(display.height - y);

    // 完全落在显示区域之外
    if width <= 0.0 || height <= 0.0 {
      debug!("锚点 {} 裁剪后为空, 丢弃", i);
      continue;
    }

    detections.push(BoundingBox {
      x,
      y,
      width,
      height,
      confidence: max_conf,
      class_id,
      label: profile.label(class_id),
    });
  }

  debug!("解码得到 {} 个候选框", detections.len());
  Ok(detections)
}

/// 按模型声明的输出名称取出张量后解码
pub fn decode_outputs(
  outputs: &NamedOutputs,
  profile: &ModelProfile,
  letterbox: &Letterbox,
  config: &DetectConfig,
) -> Result<Vec<BoundingBox>, DetectError> {
  let (name, raw) = outputs.select(profile)?;
  debug!("使用输出 {} ({} 个元素)", name, raw.len());
  decode(raw, profile, letterbox, config)
}
