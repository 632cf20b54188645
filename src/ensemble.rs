// 该文件是 Yebing（叶病）项目的一部分。
// src/ensemble.rs - 跨增强轮次的投票合并
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

use std::cmp::Ordering;

use tracing::debug;

use crate::{
  config::DetectConfig,
  model::{BoundingBox, ConsolidatedDetection, PassResult},
};

/// 贪心首次匹配分组
///
/// 依次处理每个框，加入第一个“首个成员”与其同类且 IoU 超过阈值的组，
/// 否则新建一组。结果依赖输入顺序，因此调用方必须保持轮次顺序和轮内顺序。
fn group_boxes<'a>(
  boxes: impl IntoIterator<Item = &'a BoundingBox>,
  iou_threshold: f32,
) -> Vec<Vec<&'a BoundingBox>> {
  let mut groups: Vec<Vec<&BoundingBox>> = Vec::new();

  for bbox in boxes {
    let target = groups.iter().position(|group| {
      let representative = group[0];
      representative.class_id == bbox.class_id && representative.iou(bbox) > iou_threshold
    });
    match target {
      Some(idx) => groups[idx].push(bbox),
      None => groups.push(vec![bbox]),
    }
  }

  groups
}

fn merge_group(group: &[&BoundingBox]) -> ConsolidatedDetection {
  let votes = group.len();
  let n = votes as f32;
  let mean = |f: fn(&BoundingBox) -> f32| group.iter().map(|b| f(b)).sum::<f32>() / n;

  let avg_confidence = mean(|b| b.confidence);

  // 置信度最高的成员决定类别，相同时取最先出现的
  let best = group
    .iter()
    .copied()
    .skip(1)
    .fold(group[0], |best, b| if b.confidence > best.confidence { b } else { best });

  ConsolidatedDetection {
    bbox: BoundingBox {
      x: mean(|b| b.x),
      y: mean(|b| b.y),
      width: mean(|b| b.width),
      height: mean(|b| b.height),
      confidence: avg_confidence,
      class_id: best.class_id,
      label: best.label.clone(),
    },
    votes,
    avg_confidence,
    is_high_confidence: false,
    is_uncertain: false,
  }
}

/// 合并所有轮次的检测框，按平均置信度降序返回
///
/// 置信度分级标志在此处尚未设置，由 [`crate::classify`] 负责。
pub fn consolidate(passes: &[PassResult], config: &DetectConfig) -> Vec<ConsolidatedDetection> {
  let all = passes.iter().flat_map(|pass| pass.boxes.iter());
  let groups = group_boxes(all, config.consolidation_iou_threshold);

  let mut consolidated: Vec<_> = groups.iter().map(|g| merge_group(g)).collect();
  consolidated.sort_by(|a, b| {
    b.avg_confidence
      .partial_cmp(&a.avg_confidence)
      .unwrap_or(Ordering::Equal)
  });

  debug!(
    "{} 轮共 {} 个框合并为 {} 组",
    passes.len(),
    passes.iter().map(|p| p.boxes.len()).sum::<usize>(),
    consolidated.len()
  );
  consolidated
}
