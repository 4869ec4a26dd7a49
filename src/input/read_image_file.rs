// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{DynamicImage, ImageReader, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, PackedFrame},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 把解码后的图像缩放到模型输入尺寸
pub(crate) fn to_packed(image: &DynamicImage, width: u32, height: u32) -> PackedFrame {
  let rgba = image.to_rgba8();
  if rgba.dimensions() == (width, height) {
    return PackedFrame::from(&rgba);
  }
  debug!(
    "缩放图像 {}x{} -> {}x{}",
    rgba.width(),
    rgba.height(),
    width,
    height
  );
  let resized = image::imageops::resize(&rgba, width, height, FilterType::Triangle);
  PackedFrame::from(&resized)
}

/// 读取一张图像文件并缩放为模型尺寸的帧
pub fn load_frame(
  path: &Path,
  index: u64,
  width: u32,
  height: u32,
) -> Result<Frame, ImageFileInputError> {
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  Ok(Frame {
    source: path.display().to_string(),
    index,
    image: to_packed(&image, width, height),
  })
}

/// 单张图像文件输入：`image:///path/to/cat.jpg`
pub struct ImageFileInput {
  source: String,
  image: Option<DynamicImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let path = crate::url_file_path(url);
    let image = ImageReader::open(&path)?.with_guessed_format()?.decode()?;

    Ok(ImageFileInput {
      source: path,
      image: Some(image),
    })
  }
}

impl ImageFileInput {
  pub fn into_frames(self, width: u32, height: u32) -> ImageFileFrames {
    ImageFileFrames {
      inner: self,
      width,
      height,
    }
  }
}

pub struct ImageFileFrames {
  inner: ImageFileInput,
  width: u32,
  height: u32,
}

impl Iterator for ImageFileFrames {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    let image = self.inner.image.take()?;
    Some(Frame {
      source: self.inner.source.clone(),
      index: 0,
      image: to_packed(&image, self.width, self.height),
    })
  }
}
