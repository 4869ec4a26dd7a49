// 该文件是 Shanan （山南西风） 项目的一部分。
// src/error.rs - 分类流程错误定义
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

use crate::model::EncodingMode;

/// 一次分类尝试可能产生的错误
///
/// 所有错误都以返回值的形式交给调用方，调用方负责向用户展示并允许重试。
#[derive(Error, Debug)]
pub enum ClassifyError {
  /// 模型描述无效（尺寸为零、通道数不为 3、缺少标签表等），在编码前报告
  #[error("模型描述无效: {0}")]
  InvalidModelSpec(String),
  /// 源图像像素数少于模型输入所需
  #[error("图像像素不足: 需要 {required} 个像素, 实际只有 {available} 个")]
  OutOfBoundsRead { required: usize, available: usize },
  /// 推理没有产生可用结果，对应用户可见的 "run model fail"
  #[error("run model fail: {0}")]
  NoResult(&'static str),
  /// 当前构建不支持请求的编码方式
  #[error("不支持的编码方式 {mode:?} (框架: {framework})")]
  EncodingUnsupported {
    mode: EncodingMode,
    framework: String,
  },
  /// 推理后端报告的错误
  #[error("推理错误: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ClassifyError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    ClassifyError::InvalidModelSpec(msg.into())
  }

  pub fn inference<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    ClassifyError::Inference(Box::new(err))
  }

  /// 可恢复的错误：只影响当前这张图像，报告 "run model fail" 后可继续下一张
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      ClassifyError::NoResult(_)
        | ClassifyError::OutOfBoundsRead { .. }
        | ClassifyError::Inference(_)
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn per_image_failures_are_recoverable() {
    assert!(ClassifyError::NoResult("没有得分输出").is_recoverable());
    assert!(ClassifyError::OutOfBoundsRead { required: 4, available: 1 }.is_recoverable());
    let backend = std::io::Error::other("session closed");
    assert!(ClassifyError::inference(backend).is_recoverable());
  }

  #[test]
  fn configuration_errors_are_not_recoverable() {
    assert!(!ClassifyError::invalid("width 为 0").is_recoverable());
    let unsupported = ClassifyError::EncodingUnsupported {
      mode: EncodingMode::AcceleratorNative,
      framework: "caffe".to_string(),
    };
    assert!(!unsupported.is_recoverable());
  }
}
