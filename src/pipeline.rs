// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 编码、推理、解码流程
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

use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  ClassifyError, FromUrl,
  decode::{RankedResult, decode},
  encode::{InputTensor, TensorEncoder, Yuv420SpPacker},
  frame::PixelImage,
  model::{EncodingMode, InferOutput, Model, ModelSpec, ReplayModel, ReplayModelError},
};

/// 一次推理的输出与耗时
#[derive(Debug, Clone)]
pub struct Inference {
  pub output: InferOutput,
  pub elapsed: Duration,
}

/// 分类能力：编码、推理、解码
pub trait Classify {
  fn encode<I: PixelImage>(&self, image: &I) -> Result<InputTensor, ClassifyError>;
  fn infer(&self, input: &InputTensor) -> Result<Inference, ClassifyError>;
  fn decode(&self, inference: &Inference) -> Result<RankedResult, ClassifyError>;

  fn classify<I: PixelImage>(&self, image: &I) -> Result<RankedResult, ClassifyError> {
    let input = self.encode(image)?;
    let inference = self.infer(&input)?;
    self.decode(&inference)
  }
}

/// 绑定一个加速器会话的分类流程
///
/// 会话不可重入，同一会话上的 `编码 → 推理 → 解码` 由互斥锁串行化。
pub struct ClassifyPipeline<M> {
  spec: ModelSpec,
  encoder: TensorEncoder,
  session: Mutex<M>,
}

impl<M> ClassifyPipeline<M>
where
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(spec: ModelSpec, model: M) -> Result<Self, ClassifyError> {
    Self::with_encoder(spec, model, TensorEncoder::default())
  }

  pub fn with_encoder(spec: ModelSpec, model: M, encoder: TensorEncoder) -> Result<Self, ClassifyError> {
    spec.validate()?;
    info!(
      "分类流程就绪: 输入 {}x{}, 编码 {:?}, 标签 {} 个",
      spec.input_width,
      spec.input_height,
      spec.encoding_mode,
      spec.labels.len()
    );
    Ok(Self {
      spec,
      encoder,
      session: Mutex::new(model),
    })
  }

  pub fn spec(&self) -> &ModelSpec {
    &self.spec
  }

  fn run_session(model: &M, input: &InputTensor) -> Result<Inference, ClassifyError> {
    debug!("执行模型推理, 输入 {} 字节", input.len());
    let now = Instant::now();
    let output = model.infer(input).map_err(ClassifyError::inference)?;
    let elapsed = now.elapsed();
    debug!("推理完成，耗时: {:.2?}, 输出 {} 个张量", elapsed, output.len());
    Ok(Inference { output, elapsed })
  }
}

impl<M> Classify for ClassifyPipeline<M>
where
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  fn encode<I: PixelImage>(&self, image: &I) -> Result<InputTensor, ClassifyError> {
    self.encoder.encode(image, &self.spec)
  }

  fn infer(&self, input: &InputTensor) -> Result<Inference, ClassifyError> {
    let model = self.session.lock().unwrap_or_else(|e| e.into_inner());
    Self::run_session(&model, input)
  }

  fn decode(&self, inference: &Inference) -> Result<RankedResult, ClassifyError> {
    let result = decode(inference.output.scores(), &self.spec.labels)?;
    Ok(result.with_latency(inference.elapsed))
  }

  fn classify<I: PixelImage>(&self, image: &I) -> Result<RankedResult, ClassifyError> {
    let model = self.session.lock().unwrap_or_else(|e| e.into_inner());
    let input = self.encode(image)?;
    let inference = Self::run_session(&model, &input)?;
    drop(model);
    let result = self.decode(&inference)?;
    info!("{}", result.headline());
    Ok(result)
  }
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("模型描述错误: {0}")]
  Spec(#[from] ClassifyError),
  #[error("推理结果加载错误: {0}")]
  Replay(#[from] ReplayModelError),
}

/// 由同一个模型 URL 构建描述与回放会话，输入张量长度按编码模式校验
impl FromUrl for ClassifyPipeline<ReplayModel> {
  type Error = PipelineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let spec = ModelSpec::from_url(url)?;
    let input_len = match spec.encoding_mode {
      EncodingMode::RawFloatPlanar => spec.float_tensor_len(),
      EncodingMode::AcceleratorNative => {
        Yuv420SpPacker::packed_len(spec.input_width, spec.input_height)
      }
    };
    let model = ReplayModel::from_url(url)?.expect_input_len(input_len);
    Ok(Self::new(spec, model)?)
  }
}
