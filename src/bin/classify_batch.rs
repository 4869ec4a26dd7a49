// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/classify_batch.rs - 批量图像分类
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

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use npu_classify::{
  FromUrl,
  input::InputWrapper,
  model::ReplayModel,
  output::OutputWrapper,
  pipeline::ClassifyPipeline,
  task::{BatchTask, Task},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，folder:///path/to/images 或 image:///path/to/cat.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出方式
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出方式: {}", args.output);

  let pipeline = ClassifyPipeline::<ReplayModel>::from_url(&args.model).context("模型加载失败")?;
  let (width, height) = (pipeline.spec().input_width, pipeline.spec().input_height);
  let input = InputWrapper::from_url(&args.input).context("输入打开失败")?;
  let output = OutputWrapper::from_url(&args.output)?;

  BatchTask::default()
    .interruptible(true)
    .run_task(input.into_frames(width, height), pipeline, output)?;

  Ok(())
}
