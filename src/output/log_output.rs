// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/log_output.rs - 分类结果日志输出
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
use tracing::{info, warn};
use url::Url;

use crate::{
  ClassifyError, FromUrl, FromUrlWithScheme,
  decode::RankedResult,
  frame::SourceName,
  output::Render,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 把分类结果写到日志
#[derive(Debug, Default)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Ok(LogOutput)
  }
}

impl LogOutput {
  fn log(source: &str, result: &RankedResult) {
    info!("[{}] {}", source, result.headline());
    for line in result.runners_up().lines() {
      info!("[{}] {}", source, line);
    }
    info!("[{}] {}", source, result.latency_line());
  }
}

impl<F: SourceName> Render<F, RankedResult> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &F, result: &RankedResult) -> Result<(), Self::Error> {
    Self::log(&frame.source_name(), result);
    Ok(())
  }

  fn render_failure(&self, frame: &F, error: &ClassifyError) -> Result<(), Self::Error> {
    warn!("[{}] run model fail. {}", frame.source_name(), error);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PackedFrame;

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(LogOutput::from_url(&url).is_err());
  }

  #[test]
  fn failures_are_not_errors() {
    let frame = PackedFrame::solid(1, 1, 0, 0, 0);
    let err = ClassifyError::NoResult("没有得分输出");
    assert!(LogOutput.render_failure(&frame, &err).is_ok());
  }
}
