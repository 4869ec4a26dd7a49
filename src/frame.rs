// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 像素图像定义
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

/// 可随机访问的像素图像
///
/// `pixel` 返回打包的 32 位像素：A 为 24–31 位，R 为 16–23 位，
/// G 为 8–15 位，B 为 0–7 位。没有 alpha 的图像 A 位固定为 `0xFF`。
pub trait PixelImage {
  fn width(&self) -> u32;
  fn height(&self) -> u32;
  fn pixel(&self, x: u32, y: u32) -> u32;

  fn pixel_count(&self) -> usize {
    self.width() as usize * self.height() as usize
  }
}

impl<T: PixelImage + ?Sized> PixelImage for &T {
  fn width(&self) -> u32 {
    (**self).width()
  }

  fn height(&self) -> u32 {
    (**self).height()
  }

  fn pixel(&self, x: u32, y: u32) -> u32 {
    (**self).pixel(x, y)
  }
}

pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
  (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// 拆出打包像素中的 (R, G, B)
pub fn unpack_rgb(pixel: u32) -> [u8; 3] {
  [
    ((pixel >> 16) & 0xFF) as u8,
    ((pixel >> 8) & 0xFF) as u8,
    (pixel & 0xFF) as u8,
  ]
}

/// 按行主序保存打包像素的图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFrame {
  width: u32,
  height: u32,
  data: Box<[u32]>,
}

impl PackedFrame {
  /// 单色图像
  pub fn solid(width: u32, height: u32, r: u8, g: u8, b: u8) -> Self {
    let size = width as usize * height as usize;
    let data = vec![pack_argb(0xFF, r, g, b); size].into_boxed_slice();
    Self {
      width,
      height,
      data,
    }
  }

  pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u32) -> Self {
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
      for x in 0..width {
        data.push(f(x, y));
      }
    }
    Self {
      width,
      height,
      data: data.into_boxed_slice(),
    }
  }

  pub fn as_packed(&self) -> &[u32] {
    &self.data
  }
}

impl PixelImage for PackedFrame {
  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn pixel(&self, x: u32, y: u32) -> u32 {
    self.data[y as usize * self.width as usize + x as usize]
  }
}

/// 日志与记录中用来标识图像来源的名字
pub trait SourceName {
  fn source_name(&self) -> String;
}

impl SourceName for PackedFrame {
  fn source_name(&self) -> String {
    format!("{}x{}", self.width, self.height)
  }
}

/// 输入源产生的一帧：已缩放到模型尺寸的图像及其来源
#[derive(Debug, Clone)]
pub struct Frame {
  /// 来源（文件名等）
  pub source: String,
  /// 帧索引
  pub index: u64,
  pub image: PackedFrame,
}

impl PixelImage for Frame {
  fn width(&self) -> u32 {
    self.image.width()
  }

  fn height(&self) -> u32 {
    self.image.height()
  }

  fn pixel(&self, x: u32, y: u32) -> u32 {
    self.image.pixel(x, y)
  }
}

impl SourceName for Frame {
  fn source_name(&self) -> String {
    format!("{}#{}", self.source, self.index)
  }
}

#[cfg(feature = "image")]
mod image_adapter {
  use image::{RgbImage, RgbaImage};

  use super::{PackedFrame, PixelImage, pack_argb};

  impl PixelImage for RgbaImage {
    fn width(&self) -> u32 {
      self.dimensions().0
    }

    fn height(&self) -> u32 {
      self.dimensions().1
    }

    fn pixel(&self, x: u32, y: u32) -> u32 {
      let [r, g, b, a] = self.get_pixel(x, y).0;
      pack_argb(a, r, g, b)
    }
  }

  impl PixelImage for RgbImage {
    fn width(&self) -> u32 {
      self.dimensions().0
    }

    fn height(&self) -> u32 {
      self.dimensions().1
    }

    fn pixel(&self, x: u32, y: u32) -> u32 {
      let [r, g, b] = self.get_pixel(x, y).0;
      pack_argb(0xFF, r, g, b)
    }
  }

  impl From<&RgbaImage> for PackedFrame {
    fn from(image: &RgbaImage) -> Self {
      let (width, height) = image.dimensions();
      PackedFrame::from_fn(width, height, |x, y| image.pixel(x, y))
    }
  }

  impl From<&PackedFrame> for RgbImage {
    fn from(frame: &PackedFrame) -> Self {
      RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        image::Rgb(super::unpack_rgb(frame.pixel(x, y)))
      })
    }
  }
}
