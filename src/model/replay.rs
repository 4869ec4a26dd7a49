// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/replay.rs - 回放已记录推理结果的模型
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

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  encode::InputTensor,
  model::{InferOutput, Model},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("结果文件加载错误: {0}")]
  LoadError(#[from] std::io::Error),
  #[error("结果文件格式错误: {0}")]
  FormatError(String),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输入大小不匹配: 期望 {expected} 字节, 实际 {actual} 字节")]
  InputSizeMismatch { expected: usize, actual: usize },
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按顺序循环返回记录好的输出，代替真实的加速器会话
///
/// 结果文件是 JSON 数组：元素为数字时整个数组是一次推理的得分；
/// 元素为数组时每个元素是一次推理的得分，`null` 表示该次推理没有输出。
#[derive(Debug)]
pub struct ReplayModel {
  records: Box<[InferOutput]>,
  cursor: AtomicUsize,
  input_len: Option<usize>,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = crate::url_file_path(url);
    info!("加载推理结果文件: {}", path);
    let text = std::fs::read_to_string(&path)?;
    Self::from_json(&text)
  }
}

impl ReplayModel {
  pub fn from_json(text: &str) -> Result<Self, ReplayModelError> {
    let value: Value = serde_json::from_str(text)?;
    let records = parse_records(&value)?;
    if records.is_empty() {
      return Err(ReplayModelError::FormatError("结果文件为空".to_string()));
    }
    debug!("推理结果条数: {}", records.len());
    Ok(Self::new(records))
  }

  pub fn new(records: Vec<InferOutput>) -> Self {
    Self {
      records: records.into_boxed_slice(),
      cursor: AtomicUsize::new(0),
      input_len: None,
    }
  }

  /// 要求输入张量的字节数与模型输入一致
  pub fn expect_input_len(mut self, len: usize) -> Self {
    self.input_len = Some(len);
    self
  }
}

fn parse_scores(value: &Value) -> Result<Box<[f32]>, ReplayModelError> {
  let array = value
    .as_array()
    .ok_or_else(|| ReplayModelError::FormatError(format!("期望得分数组, 实际为 {}", value)))?;
  array
    .iter()
    .map(|v| {
      v.as_f64()
        .map(|f| f as f32)
        .ok_or_else(|| ReplayModelError::FormatError(format!("得分必须为数字, 实际为 {}", v)))
    })
    .collect()
}

fn parse_records(value: &Value) -> Result<Vec<InferOutput>, ReplayModelError> {
  let array = value
    .as_array()
    .ok_or_else(|| ReplayModelError::FormatError("顶层必须为数组".to_string()))?;

  if array.is_empty() {
    return Ok(Vec::new());
  }
  if array.iter().all(Value::is_number) {
    return Ok(vec![InferOutput::new(vec![parse_scores(value)?])]);
  }

  array
    .iter()
    .map(|record| match record {
      Value::Null => Ok(InferOutput::default()),
      _ => Ok(InferOutput::new(vec![parse_scores(record)?])),
    })
    .collect()
}

impl Model for ReplayModel {
  type Error = ReplayModelError;

  fn infer(&self, input: &InputTensor) -> Result<InferOutput, Self::Error> {
    if let Some(expected) = self.input_len
      && expected != input.len()
    {
      error!("输入大小({}) != 模型输入大小({})", input.len(), expected);
      return Err(ReplayModelError::InputSizeMismatch {
        expected,
        actual: input.len(),
      });
    }

    let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.records.len();
    debug!("回放第 {} 条推理结果", index);
    Ok(self.records[index].clone())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn tensor(len: usize) -> InputTensor {
    InputTensor::from(vec![0u8; len])
  }

  #[test]
  fn flat_array_is_a_single_record() {
    let model = ReplayModel::from_json("[0.1, 0.7, 0.2]").unwrap();
    let output = model.infer(&tensor(4)).unwrap();
    assert_eq!(output.scores(), Some(&[0.1f32, 0.7, 0.2][..]));
    assert_eq!(model.infer(&tensor(4)).unwrap(), output);
  }

  #[test]
  fn nested_arrays_replay_in_order() {
    let model = ReplayModel::from_json("[[1.0, 0.0], null, [0.0, 1.0]]").unwrap();
    assert_eq!(model.infer(&tensor(1)).unwrap().scores(), Some(&[1.0f32, 0.0][..]));
    assert!(model.infer(&tensor(1)).unwrap().is_empty());
    assert_eq!(model.infer(&tensor(1)).unwrap().scores(), Some(&[0.0f32, 1.0][..]));
    assert_eq!(model.infer(&tensor(1)).unwrap().scores(), Some(&[1.0f32, 0.0][..]));
  }

  #[test]
  fn rejects_non_numeric_scores() {
    assert!(matches!(
      ReplayModel::from_json("[[0.1, \"x\"]]"),
      Err(ReplayModelError::FormatError(_))
    ));
    assert!(ReplayModel::from_json("{}").is_err());
    assert!(ReplayModel::from_json("[]").is_err());
  }

  #[test]
  fn input_size_is_checked() {
    let model = ReplayModel::from_json("[0.5]").unwrap().expect_input_len(12);
    assert!(model.infer(&tensor(12)).is_ok());
    assert!(matches!(
      model.infer(&tensor(8)),
      Err(ReplayModelError::InputSizeMismatch {
        expected: 12,
        actual: 8
      })
    ));
  }

  #[test]
  fn loads_from_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[0.25, 0.75]").unwrap();
    let url = Url::parse(&format!("replay://{}", file.path().display())).unwrap();
    let model = ReplayModel::from_url(&url).unwrap();
    assert_eq!(model.infer(&tensor(1)).unwrap().scores(), Some(&[0.25f32, 0.75][..]));
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("image:///tmp/a.json").unwrap();
    assert!(matches!(
      ReplayModel::from_url(&url),
      Err(ReplayModelError::SchemeMismatch(_))
    ));
  }
}
