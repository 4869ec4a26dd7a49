// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/image_directory.rs - 图像目录输入
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use super::read_image_file::load_frame;
use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum ImageDirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 目录中的全部图像，按文件名排序：`folder:///data/images`
pub struct ImageDirectoryInput {
  files: Vec<PathBuf>,
}

impl FromUrlWithScheme for ImageDirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageDirectoryInput {
  type Error = ImageDirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageDirectoryInputError::SchemeMismatch);
    }

    let directory = PathBuf::from(crate::url_file_path(url));
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
      if path.is_file() && is_image {
        files.push(path);
      }
    }
    files.sort();
    info!("目录 {} 中找到 {} 张图像", directory.display(), files.len());

    Ok(ImageDirectoryInput { files })
  }
}

impl ImageDirectoryInput {
  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  pub fn into_frames(self, width: u32, height: u32) -> ImageDirectoryFrames {
    ImageDirectoryFrames {
      files: self.files.into_iter(),
      index: 0,
      width,
      height,
    }
  }
}

/// 逐个解码目录中的图像，解码失败的文件记录后跳过
pub struct ImageDirectoryFrames {
  files: std::vec::IntoIter<PathBuf>,
  index: u64,
  width: u32,
  height: u32,
}

impl Iterator for ImageDirectoryFrames {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      match load_frame(&path, self.index, self.width, self.height) {
        Ok(frame) => {
          self.index += 1;
          return Some(frame);
        }
        Err(err) => warn!("读取图像 {} 失败: {}", path.display(), err),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yields_sorted_images_and_skips_broken_ones() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::from_pixel(3, 3, image::Rgb([0, 0, 255]))
      .save(dir.path().join("b.png"))
      .unwrap();
    image::RgbImage::from_pixel(5, 5, image::Rgb([0, 255, 0]))
      .save(dir.path().join("a.png"))
      .unwrap();
    std::fs::write(dir.path().join("c.jpg"), b"not an image").unwrap();
    std::fs::write(dir.path().join("labels.txt"), b"cat\n").unwrap();

    let url = Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let input = ImageDirectoryInput::from_url(&url).unwrap();
    assert_eq!(input.len(), 3);

    let frames: Vec<Frame> = input.into_frames(2, 2).collect();
    assert_eq!(frames.len(), 2);
    assert!(frames[0].source.ends_with("a.png"));
    assert!(frames[1].source.ends_with("b.png"));
    assert_eq!(frames[1].index, 1);
    assert_eq!(frames[0].image.as_packed(), &[0xFF00_FF00; 4]);
  }

  #[test]
  fn missing_directory_is_io_error() {
    let url = Url::parse("folder:///nonexistent/images").unwrap();
    assert!(matches!(
      ImageDirectoryInput::from_url(&url),
      Err(ImageDirectoryInputError::IoError(_))
    ));
  }
}
