// 该文件是 Shanan （山南西风） 项目的一部分。
// src/encode/yuv420sp.rs - 加速器预处理单元使用的 YUV420SP 打包
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
  ClassifyError,
  encode::NativePacker,
  frame::{PixelImage, unpack_rgb},
};

/// 色度平面中 U、V 的交错顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaOrder {
  /// NV21
  #[default]
  Vu,
  /// NV12
  Uv,
}

/// 8 位 YUV420 半平面打包（BT.601，有限范围）
///
/// 先写 `width * height` 字节的 Y 平面，再写交错的色度平面；
/// 每个 2x2 块取左上角像素的色度。
#[derive(Debug, Clone, Copy, Default)]
pub struct Yuv420SpPacker {
  chroma: ChromaOrder,
}

impl Yuv420SpPacker {
  pub fn new(chroma: ChromaOrder) -> Self {
    Self { chroma }
  }

  pub fn packed_len(width: u32, height: u32) -> usize {
    let (w, h) = (width as usize, height as usize);
    w * h + 2 * w.div_ceil(2) * h.div_ceil(2)
  }
}

fn clamp_u8(v: i32) -> u8 {
  v.clamp(0, 255) as u8
}

fn rgb_to_yuv([r, g, b]: [u8; 3]) -> (u8, u8, u8) {
  let (r, g, b) = (r as i32, g as i32, b as i32);
  let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
  let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
  let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
  (clamp_u8(y), clamp_u8(u), clamp_u8(v))
}

impl NativePacker for Yuv420SpPacker {
  fn pack(
    &self,
    image: &dyn PixelImage,
    width: u32,
    height: u32,
  ) -> Result<Vec<u8>, ClassifyError> {
    if image.width() < width || image.height() < height {
      error!(
        "图像尺寸 {}x{} 小于模型输入 {}x{}",
        image.width(),
        image.height(),
        width,
        height
      );
      return Err(ClassifyError::OutOfBoundsRead {
        required: width as usize * height as usize,
        available: image.pixel_count(),
      });
    }

    let mut data = Vec::with_capacity(Self::packed_len(width, height));
    for y in 0..height {
      for x in 0..width {
        data.push(rgb_to_yuv(unpack_rgb(image.pixel(x, y))).0);
      }
    }

    for y in (0..height).step_by(2) {
      for x in (0..width).step_by(2) {
        let (_, u, v) = rgb_to_yuv(unpack_rgb(image.pixel(x, y)));
        match self.chroma {
          ChromaOrder::Vu => data.extend_from_slice(&[v, u]),
          ChromaOrder::Uv => data.extend_from_slice(&[u, v]),
        }
      }
    }

    debug!("YUV420SP 打包完成: {}x{}, {} 字节", width, height, data.len());
    Ok(data)
  }
}
