// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use image::RgbImage;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::{
  ClassifyError, FromUrl, FromUrlWithScheme,
  decode::RankedResult,
  frame::Frame,
  output::Render,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存每次分类的 JSON 记录
///
/// `folder:///data/records?image&always`：`image` 同时保存缩放后的输入图像，
/// `always` 连失败的分类也记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counters: Mutex<u16>,
  save_image: bool,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let save_image = uri.query_pairs().any(|(k, _)| k == "image");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(crate::url_file_path(uri)),
      frame_counters: Mutex::new(0),
      save_image,
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counters.lock().unwrap_or_else(|e| e.into_inner());
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn record_path(&self, now: &DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.json",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn write_record(&self, frame: &Frame, body: Value) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let path = self.record_path(&now)?;
    let record = json!({
      "source": frame.source,
      "index": frame.index,
      "timestamp": now.to_rfc3339(),
      "result": body,
    });
    std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;

    if self.save_image {
      save_frame_image(frame, &path.with_extension("png"))?;
    }

    debug!("保存分类记录到文件: {}", path.display());
    Ok(path)
  }
}

fn save_frame_image(frame: &Frame, path: &Path) -> Result<(), DirectoryRecordOutputError> {
  let image = RgbImage::from(&frame.image);
  image.save(path)?;
  Ok(())
}

impl Render<Frame, RankedResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &RankedResult) -> Result<(), Self::Error> {
    self.write_record(frame, result.to_json())?;
    Ok(())
  }

  fn render_failure(&self, frame: &Frame, error: &ClassifyError) -> Result<(), Self::Error> {
    if self.always {
      self.write_record(frame, json!({ "error": error.to_string() }))?;
    }
    Ok(())
  }
}
