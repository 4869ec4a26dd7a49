// 该文件是 Shanan （山南西风） 项目的一部分。
// src/encode.rs - 图像到输入张量的编码
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

use std::collections::HashMap;

use tracing::{debug, error};

use crate::{
  ClassifyError,
  frame::{PixelImage, unpack_rgb},
  model::{EncodingMode, Framework, ModelSpec, RGB_CHANNELS, TensorByteOrder},
};

mod yuv420sp;
pub use self::yuv420sp::{ChromaOrder, Yuv420SpPacker};

const IMAGE_MEAN: f32 = 0.0;
const IMAGE_STD: f32 = 255.0;

/// 交给推理边界的输入字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
  data: Box<[u8]>,
}

impl InputTensor {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// 按给定字节序把字节还原为 f32 序列，多余的尾部字节被忽略
  pub fn to_f32_vec(&self, order: TensorByteOrder) -> Vec<f32> {
    self
      .data
      .chunks_exact(4)
      .map(|c| order.read_f32([c[0], c[1], c[2], c[3]]))
      .collect()
  }
}

impl From<Vec<u8>> for InputTensor {
  fn from(data: Vec<u8>) -> Self {
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl AsRef<[u8]> for InputTensor {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}

/// 加速器原生像素格式的打包器
pub trait NativePacker: Send + Sync {
  fn pack(
    &self,
    image: &dyn PixelImage,
    width: u32,
    height: u32,
  ) -> Result<Vec<u8>, ClassifyError>;
}

/// 图像编码器，按 `EncodingMode` 分派
pub struct TensorEncoder {
  native: HashMap<Framework, Box<dyn NativePacker>>,
  native_fallback: Option<Box<dyn NativePacker>>,
}

impl Default for TensorEncoder {
  fn default() -> Self {
    Self::float_only().with_native_fallback(Yuv420SpPacker::default())
  }
}

impl TensorEncoder {
  /// 只支持浮点平面编码的编码器
  pub fn float_only() -> Self {
    Self {
      native: HashMap::new(),
      native_fallback: None,
    }
  }

  pub fn with_native(mut self, framework: Framework, packer: impl NativePacker + 'static) -> Self {
    self.native.insert(framework, Box::new(packer));
    self
  }

  /// 没有为框架单独注册打包器时使用
  pub fn with_native_fallback(mut self, packer: impl NativePacker + 'static) -> Self {
    self.native_fallback = Some(Box::new(packer));
    self
  }

  pub fn encode<I: PixelImage>(&self, image: &I, spec: &ModelSpec) -> Result<InputTensor, ClassifyError> {
    spec.validate()?;
    match spec.encoding_mode {
      EncodingMode::RawFloatPlanar => encode_float_planar(image, spec),
      EncodingMode::AcceleratorNative => self.encode_native(image, spec),
    }
  }

  fn encode_native<I: PixelImage>(&self, image: &I, spec: &ModelSpec) -> Result<InputTensor, ClassifyError> {
    let packer = self
      .native
      .get(&spec.framework)
      .or(self.native_fallback.as_ref())
      .ok_or_else(|| {
        error!("没有可用的原生编码器, 框架: {}", spec.framework);
        ClassifyError::EncodingUnsupported {
          mode: spec.encoding_mode,
          framework: spec.framework.to_string(),
        }
      })?;

    let data = packer.pack(image, spec.input_width, spec.input_height)?;
    debug!("原生编码完成, 字节数: {}", data.len());
    Ok(InputTensor::from(data))
  }
}

fn normalize(raw: u8) -> f32 {
  (raw as f32 - IMAGE_MEAN) / IMAGE_STD
}

/// 浮点平面编码
///
/// 像素按源图像的行主序逐个读取，共读取 `input_width * input_height` 个；
/// 第 k 个像素写到每个平面的第 k 个位置。平面写出顺序由 `PlaneOrder` 决定。
fn encode_float_planar<I: PixelImage>(image: &I, spec: &ModelSpec) -> Result<InputTensor, ClassifyError> {
  let count = spec.pixel_count();
  let available = image.pixel_count();
  if available < count {
    error!("图像像素不足: 需要 {}, 实际 {}", count, available);
    return Err(ClassifyError::OutOfBoundsRead {
      required: count,
      available,
    });
  }

  let stride = image.width() as usize;
  let mut planes: [Vec<f32>; RGB_CHANNELS as usize] = std::array::from_fn(|_| Vec::with_capacity(count));
  for index in 0..count {
    let x = (index % stride) as u32;
    let y = (index / stride) as u32;
    let rgb = unpack_rgb(image.pixel(x, y));
    for (plane, raw) in planes.iter_mut().zip(rgb) {
      plane.push(normalize(raw));
    }
  }

  let mut data = Vec::with_capacity(spec.float_tensor_len());
  for channel in spec.plane_order.channels() {
    for &value in &planes[channel] {
      data.extend_from_slice(&spec.byte_order.write_f32(value));
    }
  }

  debug!(
    "浮点平面编码完成: {}x{}, 字节数: {}",
    spec.input_width,
    spec.input_height,
    data.len()
  );
  Ok(InputTensor::from(data))
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::{
    frame::{PackedFrame, pack_argb},
    model::{Labels, PlaneOrder},
  };

  fn spec(width: u32, height: u32) -> ModelSpec {
    ModelSpec::new(width, height, ["a", "b", "c"].into_iter().collect::<Labels>())
  }

  fn assert_close(actual: f32, expected: f32) {
    assert!(
      (actual - expected).abs() < 1e-6,
      "expected {}, got {}",
      expected,
      actual
    );
  }

  #[test]
  fn solid_color_fills_each_plane() {
    let frame = PackedFrame::solid(4, 3, 128, 64, 32);
    let tensor = TensorEncoder::default().encode(&frame, &spec(4, 3)).unwrap();
    assert_eq!(tensor.len(), 4 * 3 * 3 * 4);

    let values = tensor.to_f32_vec(TensorByteOrder::Little);
    let (r, rest) = values.split_at(12);
    let (g, b) = rest.split_at(12);
    r.iter().for_each(|&v| assert_close(v, 128.0 / 255.0));
    g.iter().for_each(|&v| assert_close(v, 64.0 / 255.0));
    b.iter().for_each(|&v| assert_close(v, 32.0 / 255.0));
  }

  #[test]
  fn legacy_plane_order_swaps_second_and_third_planes() {
    let frame = PackedFrame::solid(2, 2, 128, 64, 32);
    let spec = spec(2, 2).plane_order(PlaneOrder::Rbg);
    let values = TensorEncoder::default()
      .encode(&frame, &spec)
      .unwrap()
      .to_f32_vec(TensorByteOrder::Little);
    assert_close(values[0], 128.0 / 255.0);
    assert_close(values[4], 32.0 / 255.0);
    assert_close(values[8], 64.0 / 255.0);
  }

  #[test]
  fn planes_follow_row_major_pixel_order() {
    // 每个像素的 R 通道等于其行主序下标
    let frame = PackedFrame::from_fn(3, 2, |x, y| pack_argb(0xFF, (y * 3 + x) as u8, 0, 0));
    let values = TensorEncoder::default()
      .encode(&frame, &spec(3, 2))
      .unwrap()
      .to_f32_vec(TensorByteOrder::Little);
    for (k, &v) in values[..6].iter().enumerate() {
      assert_close(v, k as f32 / 255.0);
    }
  }

  #[test]
  fn big_endian_output_is_pinned() {
    let frame = PackedFrame::solid(1, 1, 255, 0, 0);
    let spec = spec(1, 1).byte_order(TensorByteOrder::Big);
    let tensor = TensorEncoder::default().encode(&frame, &spec).unwrap();
    assert_eq!(&tensor.as_bytes()[..4], &1.0f32.to_be_bytes());
  }

  #[test]
  fn too_few_pixels_is_an_error() {
    let frame = PackedFrame::solid(2, 2, 1, 2, 3);
    let err = TensorEncoder::default().encode(&frame, &spec(3, 3)).unwrap_err();
    assert!(matches!(
      err,
      ClassifyError::OutOfBoundsRead {
        required: 9,
        available: 4
      }
    ));
  }

  #[test]
  fn larger_image_reads_only_required_pixels() {
    let frame = PackedFrame::solid(5, 5, 10, 20, 30);
    let tensor = TensorEncoder::default().encode(&frame, &spec(2, 2)).unwrap();
    assert_eq!(tensor.len(), 2 * 2 * 3 * 4);
  }

  #[test]
  fn invalid_spec_fails_before_encoding() {
    let frame = PackedFrame::solid(2, 2, 1, 2, 3);
    let spec = ModelSpec::new(2, 2, Labels::default());
    assert!(matches!(
      TensorEncoder::default().encode(&frame, &spec),
      Err(ClassifyError::InvalidModelSpec(_))
    ));
  }

  #[test]
  fn native_mode_without_packer_is_unsupported() {
    let frame = PackedFrame::solid(2, 2, 1, 2, 3);
    let spec = spec(2, 2).encoding_mode(EncodingMode::AcceleratorNative);
    assert!(matches!(
      TensorEncoder::float_only().encode(&frame, &spec),
      Err(ClassifyError::EncodingUnsupported { .. })
    ));
  }

  struct FixedPacker(u8);

  impl NativePacker for FixedPacker {
    fn pack(&self, _: &dyn PixelImage, width: u32, height: u32) -> Result<Vec<u8>, ClassifyError> {
      Ok(vec![self.0; (width * height) as usize])
    }
  }

  #[test]
  fn native_mode_dispatches_on_framework() {
    let encoder = TensorEncoder::float_only()
      .with_native(Framework::TensorFlow, FixedPacker(7))
      .with_native_fallback(FixedPacker(1));
    let frame = PackedFrame::solid(2, 2, 1, 2, 3);

    let tf = spec(2, 2)
      .encoding_mode(EncodingMode::AcceleratorNative)
      .framework(Framework::TensorFlow);
    assert_eq!(encoder.encode(&frame, &tf).unwrap().as_bytes(), &[7; 4]);

    let caffe = tf.clone().framework(Framework::Caffe);
    assert_eq!(encoder.encode(&frame, &caffe).unwrap().as_bytes(), &[1; 4]);
  }

  proptest! {
    #[test]
    fn float_tensor_has_fixed_length(
      width in 1u32..24,
      height in 1u32..24,
      seed in any::<u32>(),
    ) {
      let frame = PackedFrame::from_fn(width, height, |x, y| seed ^ (x * 31 + y * 17));
      let spec = spec(width, height);
      let encoder = TensorEncoder::default();
      let first = encoder.encode(&frame, &spec).unwrap();
      prop_assert_eq!(first.len(), (width * height * 3 * 4) as usize);
      let second = encoder.encode(&frame, &spec).unwrap();
      prop_assert_eq!(first, second);
    }
  }
}
