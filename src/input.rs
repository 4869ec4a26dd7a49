// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::FromUrl;
#[cfg(feature = "read_image_file")]
use crate::frame::Frame;

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, ImageFileFrames, load_frame};

#[cfg(feature = "read_image_file")]
mod image_directory;
#[cfg(feature = "read_image_file")]
pub use self::image_directory::{ImageDirectoryFrames, ImageDirectoryInput, ImageDirectoryInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "read_image_file")]
  #[error("图像目录输入错误: {0}")]
  ImageDirectoryInputError(#[from] ImageDirectoryInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "read_image_file")]
  ImageDirectory(ImageDirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        return Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?));
      }
      if url.scheme() == ImageDirectoryInput::SCHEME {
        return Ok(InputWrapper::ImageDirectory(ImageDirectoryInput::from_url(url)?));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

#[cfg(feature = "read_image_file")]
impl InputWrapper {
  /// 按模型输入尺寸产生帧
  pub fn into_frames(self, width: u32, height: u32) -> InputWrapperFrames {
    match self {
      InputWrapper::ReadImageFile(input) => {
        InputWrapperFrames::ReadImageFile(input.into_frames(width, height))
      }
      InputWrapper::ImageDirectory(input) => {
        InputWrapperFrames::ImageDirectory(input.into_frames(width, height))
      }
    }
  }
}

#[cfg(feature = "read_image_file")]
pub enum InputWrapperFrames {
  ReadImageFile(ImageFileFrames),
  ImageDirectory(ImageDirectoryFrames),
}

#[cfg(feature = "read_image_file")]
impl Iterator for InputWrapperFrames {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapperFrames::ReadImageFile(input) => input.next(),
      InputWrapperFrames::ImageDirectory(input) => input.next(),
    }
  }
}
