// 该文件是 Shanan （山南西风） 项目的一部分。
// src/decode.rs - Top-K 得分解码
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

use std::fmt;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{ClassifyError, model::Labels};

pub const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
  pub class_id: usize,
  pub label: String,
  pub score: f32,
}

impl fmt::Display for RankedEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} - {:.2}%", self.label, self.score * 100.0)
  }
}

/// 按得分降序排列的前 K 名，下标 0 为第一名
///
/// 有效得分少于 K 个时，末尾的名次为空。
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult<const K: usize = TOP_K> {
  entries: [Option<RankedEntry>; K],
  latency: Option<Duration>,
}

impl<const K: usize> RankedResult<K> {
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  pub fn latency(&self) -> Option<Duration> {
    self.latency
  }

  /// 第 `rank` 名（从 0 开始）
  pub fn get(&self, rank: usize) -> Option<&RankedEntry> {
    self.entries.get(rank).and_then(Option::as_ref)
  }

  pub fn top(&self) -> Option<&RankedEntry> {
    self.get(0)
  }

  pub fn entries(&self) -> impl Iterator<Item = &RankedEntry> {
    self.entries.iter().flatten()
  }

  pub fn headline(&self) -> String {
    self.top().map(ToString::to_string).unwrap_or_default()
  }

  /// 第二名之后的各名次，每行一个
  pub fn runners_up(&self) -> String {
    self
      .entries()
      .skip(1)
      .map(|entry| format!("{}\n", entry))
      .collect()
  }

  pub fn latency_line(&self) -> String {
    match self.latency {
      Some(latency) => format!("inference time: {:.2}ms", latency.as_secs_f64() * 1000.0),
      None => String::new(),
    }
  }

  pub fn to_json(&self) -> Value {
    let ranks: Vec<Value> = self
      .entries()
      .map(|entry| {
        json!({
          "class_id": entry.class_id,
          "label": entry.label,
          "score": entry.score,
        })
      })
      .collect();
    json!({
      "ranks": ranks,
      "latency_ms": self.latency.map(|l| l.as_secs_f64() * 1000.0),
    })
  }
}

impl<const K: usize> fmt::Display for RankedResult<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.headline())?;
    write!(f, "{}", self.runners_up())?;
    write!(f, "{}", self.latency_line())
  }
}

/// 解码前三名
pub fn decode(scores: Option<&[f32]>, labels: &Labels) -> Result<RankedResult, ClassifyError> {
  decode_top_k(scores, labels)
}

/// 单次扫描得分，维护 K 个名次的插入排序
///
/// 只扫描前 `min(scores.len(), labels.len())` 个得分。得分相同时先出现的类别
/// 排在前面。NaN 得分被跳过。
pub fn decode_top_k<const K: usize>(
  scores: Option<&[f32]>,
  labels: &Labels,
) -> Result<RankedResult<K>, ClassifyError> {
  let scores = match scores {
    Some(scores) if !scores.is_empty() => scores,
    _ => {
      warn!("推理没有输出得分");
      return Err(ClassifyError::NoResult("没有得分输出"));
    }
  };
  if labels.is_empty() {
    warn!("标签表为空, 无法解码");
    return Err(ClassifyError::NoResult("标签表为空"));
  }

  let limit = scores.len().min(labels.len());
  if scores.len() != labels.len() {
    debug!(
      "得分数量 {} 与标签数量 {} 不一致, 只解码前 {} 个",
      scores.len(),
      labels.len(),
      limit
    );
  }

  let mut slots: [Option<(usize, f32)>; K] = [None; K];
  for (index, &score) in scores[..limit].iter().enumerate() {
    if score.is_nan() {
      continue;
    }
    if let Some(pos) = slots
      .iter()
      .position(|slot| slot.is_none_or(|(_, best)| score > best))
    {
      slots[pos..].rotate_right(1);
      slots[pos] = Some((index, score));
    }
  }

  if slots.iter().all(Option::is_none) {
    warn!("没有有效得分");
    return Err(ClassifyError::NoResult("没有有效得分"));
  }

  let entries = slots.map(|slot| {
    slot.and_then(|(class_id, score)| {
      labels.get(class_id).map(|label| RankedEntry {
        class_id,
        label: label.to_string(),
        score,
      })
    })
  });

  debug!("解码结果: {:?}", entries);
  Ok(RankedResult {
    entries,
    latency: None,
  })
}
