// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 分类任务
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

use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

use tracing::{info, warn};

use crate::{
  decode::RankedResult,
  frame::PixelImage,
  output::Render,
  pipeline::Classify,
};

pub trait Task<I, C, O>: Sized {
  type Error;
  fn run_task(self, input: I, classifier: C, output: O) -> Result<(), Self::Error>;
}

/// 批量分类的耗时累计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyAccumulator {
  total: Duration,
  count: u32,
  failures: u32,
}

impl LatencyAccumulator {
  pub fn record(&mut self, latency: Duration) {
    self.total += latency;
    self.count += 1;
  }

  pub fn record_failure(&mut self) {
    self.failures += 1;
  }

  pub fn count(&self) -> u32 {
    self.count
  }

  pub fn failures(&self) -> u32 {
    self.failures
  }

  pub fn total(&self) -> Duration {
    self.total
  }

  /// 成功分类的平均推理耗时
  pub fn average(&self) -> Option<Duration> {
    (self.count > 0).then(|| self.total / self.count)
  }
}

/// 依次分类每一帧并交给输出，累计推理耗时
///
/// 可恢复的错误（没有结果、像素不足、推理失败）只记为失败并继续；其它错误终止批量。
/// `stop` 收到信号后在当前帧结束时退出。
pub fn classify_batch<F, I, C, O>(
  frames: I,
  classifier: &C,
  output: &O,
  mut accumulator: LatencyAccumulator,
  stop: Option<&Receiver<()>>,
) -> anyhow::Result<LatencyAccumulator>
where
  F: PixelImage,
  I: IntoIterator<Item = F>,
  C: Classify,
  O: Render<F, RankedResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  for (index, frame) in frames.into_iter().enumerate() {
    info!("处理第 {} 帧图像", index);
    match classifier.classify(&frame) {
      Ok(result) => {
        if let Some(latency) = result.latency() {
          accumulator.record(latency);
        }
        output.render_result(&frame, &result)?;
      }
      Err(err) if err.is_recoverable() => {
        warn!("第 {} 帧分类失败: {}", index, err);
        accumulator.record_failure();
        output.render_failure(&frame, &err)?;
      }
      Err(err) => return Err(err.into()),
    }

    if stop.is_some_and(|rx| rx.try_recv().is_ok()) {
      warn!("中断信号接收，退出任务循环");
      break;
    }
  }
  Ok(accumulator)
}

pub struct OneShotTask;

impl<F, I, C, O> Task<I, C, O> for OneShotTask
where
  F: PixelImage,
  I: Iterator<Item = F>,
  C: Classify,
  O: Render<F, RankedResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, classifier: C, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    match classifier.classify(&frame) {
      Ok(result) => {
        info!("推理完成，{}", result.latency_line());
        output.render_result(&frame, &result)?;
      }
      Err(err) if err.is_recoverable() => {
        warn!("分类失败: {}", err);
        output.render_failure(&frame, &err)?;
      }
      Err(err) => return Err(err.into()),
    }
    info!("渲染完成");

    Ok(())
  }
}

/// 对同一帧重复分类，统计平均推理耗时
pub struct RepeatShotTask {
  repeat: usize,
  warm_up: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat: 1000,
      warm_up: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }

  /// 前若干次推理不计入平均值
  pub fn with_warm_up(mut self, warm_up: usize) -> Self {
    self.warm_up = warm_up;
    self
  }

  pub fn run<F, C, O>(&self, frame: &F, classifier: &C, output: &O) -> anyhow::Result<LatencyAccumulator>
  where
    F: PixelImage,
    C: Classify,
    O: Render<F, RankedResult>,
    O::Error: std::error::Error + Send + Sync + 'static,
  {
    let mut accumulator = LatencyAccumulator::default();
    for i in 0..self.repeat {
      match classifier.classify(frame) {
        Ok(result) => {
          let latency = result.latency().unwrap_or_default();
          info!("({})推理完成，耗时: {:.2?}", i, latency);
          output.render_result(frame, &result)?;
          if i >= self.warm_up {
            accumulator.record(latency);
          }
        }
        Err(err) if err.is_recoverable() => {
          warn!("({})分类失败: {}", i, err);
          accumulator.record_failure();
          output.render_failure(frame, &err)?;
        }
        Err(err) => return Err(err.into()),
      }
    }
    Ok(accumulator)
  }
}

impl<F, I, C, O> Task<I, C, O> for RepeatShotTask
where
  F: PixelImage,
  I: Iterator<Item = F>,
  C: Classify,
  O: Render<F, RankedResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, classifier: C, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let accumulator = self.run(&frame, &classifier, &output)?;

    match accumulator.average() {
      Some(average) => warn!(
        "平均推理时间: {:.2?}, 总计 {:.2?}, 失败 {} 次",
        average,
        accumulator.total(),
        accumulator.failures()
      ),
      None => warn!("重复次数不足 {} 次, 没有统计平均推理时间", self.warm_up + 1),
    }

    Ok(())
  }
}

/// 批量分类输入源中的所有帧
#[derive(Default, Debug)]
pub struct BatchTask {
  interruptible: bool,
}

impl BatchTask {
  /// 安装 Ctrl-C 处理，收到信号后在当前帧结束时退出
  pub fn interruptible(mut self, interruptible: bool) -> Self {
    self.interruptible = interruptible;
    self
  }
}

impl<F, I, C, O> Task<I, C, O> for BatchTask
where
  F: PixelImage,
  I: Iterator<Item = F>,
  C: Classify,
  O: Render<F, RankedResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, classifier: C, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let stop = if self.interruptible {
      let (tx, rx) = channel();
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
      })?;
      Some(rx)
    } else {
      None
    };

    let accumulator = classify_batch(
      input,
      &classifier,
      &output,
      LatencyAccumulator::default(),
      stop.as_ref(),
    )?;

    match accumulator.average() {
      Some(average) => warn!(
        "共分类 {} 张图像, 失败 {} 张, 平均推理时间: {:.2?}, 总计 {:.2?}",
        accumulator.count(),
        accumulator.failures(),
        average,
        accumulator.total()
      ),
      None => warn!("没有成功分类的图像, 失败 {} 张", accumulator.failures()),
    }

    info!("任务完成，退出");
    Ok(())
  }
}
