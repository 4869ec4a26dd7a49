// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型描述与推理边界
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
use std::str::FromStr;

use tracing::{debug, error};
use url::Url;

use crate::{ClassifyError, FromUrl, encode::InputTensor};

mod labels;
mod replay;

pub use self::labels::Labels;
pub use self::replay::{ReplayModel, ReplayModelError};

pub const RGB_CHANNELS: u32 = 3;

/// 推理边界：把编码好的输入交给加速器，取回各输出张量
pub trait Model {
  type Error;

  fn infer(&self, input: &InputTensor) -> Result<InferOutput, Self::Error>;
}

/// 一次推理的全部输出张量
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferOutput {
  tensors: Vec<Box<[f32]>>,
}

impl InferOutput {
  pub fn new(tensors: Vec<Box<[f32]>>) -> Self {
    Self { tensors }
  }

  /// 分类得分取第一个输出张量
  pub fn scores(&self) -> Option<&[f32]> {
    self.tensors.first().map(|t| &t[..])
  }

  pub fn len(&self) -> usize {
    self.tensors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensors.is_empty()
  }
}

impl From<Vec<f32>> for InferOutput {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      tensors: vec![scores.into_boxed_slice()],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncodingMode {
  /// 32 位浮点、按通道分平面存放
  #[default]
  RawFloatPlanar,
  /// 交给加速器预处理单元的原生像素格式
  AcceleratorNative,
}

impl FromStr for EncodingMode {
  type Err = ClassifyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "float" | "raw" => Ok(EncodingMode::RawFloatPlanar),
      "native" | "aipp" => Ok(EncodingMode::AcceleratorNative),
      _ => Err(ClassifyError::invalid(format!("未知的编码方式: {}", s))),
    }
  }
}

/// 模型来源框架，用于选择原生编码方式
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Framework {
  #[default]
  Caffe,
  TensorFlow,
  Other(String),
}

impl fmt::Display for Framework {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Framework::Caffe => write!(f, "caffe"),
      Framework::TensorFlow => write!(f, "tensorflow"),
      Framework::Other(name) => write!(f, "{}", name),
    }
  }
}

impl From<&str> for Framework {
  fn from(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "caffe" => Framework::Caffe,
      "tensorflow" | "tf" => Framework::TensorFlow,
      other => Framework::Other(other.to_string()),
    }
  }
}

/// 浮点张量写出时的字节序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorByteOrder {
  #[default]
  Little,
  Big,
  Native,
}

impl TensorByteOrder {
  pub fn write_f32(self, value: f32) -> [u8; 4] {
    match self {
      TensorByteOrder::Little => value.to_le_bytes(),
      TensorByteOrder::Big => value.to_be_bytes(),
      TensorByteOrder::Native => value.to_ne_bytes(),
    }
  }

  pub fn read_f32(self, bytes: [u8; 4]) -> f32 {
    match self {
      TensorByteOrder::Little => f32::from_le_bytes(bytes),
      TensorByteOrder::Big => f32::from_be_bytes(bytes),
      TensorByteOrder::Native => f32::from_ne_bytes(bytes),
    }
  }
}

impl FromStr for TensorByteOrder {
  type Err = ClassifyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "le" | "little" => Ok(TensorByteOrder::Little),
      "be" | "big" => Ok(TensorByteOrder::Big),
      "native" => Ok(TensorByteOrder::Native),
      _ => Err(ClassifyError::invalid(format!("未知的字节序: {}", s))),
    }
  }
}

/// 通道平面的写出顺序
///
/// `Rgb`：R、通道 1、通道 2；`Rbg`：R、通道 2、通道 1，
/// 与早期 Android 演示程序实际写出的顺序一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaneOrder {
  #[default]
  Rgb,
  Rbg,
}

impl PlaneOrder {
  /// 第 i 个平面对应的通道下标
  pub fn channels(self) -> [usize; 3] {
    match self {
      PlaneOrder::Rgb => [0, 1, 2],
      PlaneOrder::Rbg => [0, 2, 1],
    }
  }
}

impl FromStr for PlaneOrder {
  type Err = ClassifyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "rgb" => Ok(PlaneOrder::Rgb),
      "rbg" => Ok(PlaneOrder::Rbg),
      _ => Err(ClassifyError::invalid(format!("未知的平面顺序: {}", s))),
    }
  }
}

/// 模型输入几何、编码方式与标签表，一次运行内不可变
#[derive(Debug, Clone)]
pub struct ModelSpec {
  pub input_width: u32,
  pub input_height: u32,
  pub channel_count: u32,
  pub encoding_mode: EncodingMode,
  pub framework: Framework,
  pub byte_order: TensorByteOrder,
  pub plane_order: PlaneOrder,
  pub labels: Labels,
}

impl ModelSpec {
  pub fn new(input_width: u32, input_height: u32, labels: Labels) -> Self {
    Self {
      input_width,
      input_height,
      channel_count: RGB_CHANNELS,
      encoding_mode: EncodingMode::default(),
      framework: Framework::default(),
      byte_order: TensorByteOrder::default(),
      plane_order: PlaneOrder::default(),
      labels,
    }
  }

  pub fn encoding_mode(mut self, mode: EncodingMode) -> Self {
    self.encoding_mode = mode;
    self
  }

  pub fn framework(mut self, framework: Framework) -> Self {
    self.framework = framework;
    self
  }

  pub fn byte_order(mut self, order: TensorByteOrder) -> Self {
    self.byte_order = order;
    self
  }

  pub fn plane_order(mut self, order: PlaneOrder) -> Self {
    self.plane_order = order;
    self
  }

  pub fn pixel_count(&self) -> usize {
    self.input_width as usize * self.input_height as usize
  }

  /// 浮点平面编码时输入张量的字节数
  pub fn float_tensor_len(&self) -> usize {
    self.pixel_count() * self.channel_count as usize * std::mem::size_of::<f32>()
  }

  pub fn validate(&self) -> Result<(), ClassifyError> {
    if self.input_width == 0 || self.input_height == 0 {
      error!(
        "模型输入尺寸无效: {}x{}",
        self.input_width, self.input_height
      );
      return Err(ClassifyError::invalid(format!(
        "输入尺寸必须为正数, 实际为 {}x{}",
        self.input_width, self.input_height
      )));
    }
    if self.channel_count != RGB_CHANNELS {
      return Err(ClassifyError::invalid(format!(
        "通道数必须为 {}, 实际为 {}",
        RGB_CHANNELS, self.channel_count
      )));
    }
    if self.labels.is_empty() {
      return Err(ClassifyError::invalid("缺少标签表"));
    }
    Ok(())
  }
}

fn parse_param<T: FromStr>(url: &Url, key: &str) -> Result<Option<T>, ClassifyError> {
  match url.query_pairs().find(|(k, _)| k == key) {
    Some((_, v)) => v
      .parse::<T>()
      .map(Some)
      .map_err(|_| ClassifyError::invalid(format!("参数 {} 无效: {}", key, v))),
    None => Ok(None),
  }
}

/// 从模型 URL 的查询参数构建，例如
/// `replay:///data/scores.json?width=224&height=224&labels=/data/labels.txt&mode=float`
impl FromUrl for ModelSpec {
  type Error = ClassifyError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let width: u32 = parse_param(url, "width")?
      .ok_or_else(|| ClassifyError::invalid("模型 URL 缺少 width 参数"))?;
    let height: u32 = parse_param(url, "height")?
      .ok_or_else(|| ClassifyError::invalid("模型 URL 缺少 height 参数"))?;
    let labels_path: String = parse_param(url, "labels")?
      .ok_or_else(|| ClassifyError::invalid("模型 URL 缺少 labels 参数"))?;

    let labels = Labels::load(&labels_path)
      .map_err(|e| ClassifyError::invalid(format!("无法读取标签文件 {}: {}", labels_path, e)))?;

    let mut spec = ModelSpec::new(width, height, labels);
    if let Some(mode) = parse_param::<String>(url, "mode")? {
      spec = spec.encoding_mode(mode.parse()?);
    }
    if let Some(framework) = parse_param::<String>(url, "framework")? {
      spec = spec.framework(Framework::from(framework.as_str()));
    }
    if let Some(order) = parse_param::<String>(url, "byte_order")? {
      spec = spec.byte_order(order.parse()?);
    }
    if let Some(order) = parse_param::<String>(url, "planes")? {
      spec = spec.plane_order(order.parse()?);
    }

    debug!(
      "模型描述: {}x{}, 编码 {:?}, 框架 {}, 字节序 {:?}, 平面 {:?}",
      spec.input_width,
      spec.input_height,
      spec.encoding_mode,
      spec.framework,
      spec.byte_order,
      spec.plane_order
    );

    spec.validate()?;
    Ok(spec)
  }
}
