// 该文件是 Alfabedu 项目的一部分。
// src/error.rs - 识别流水线错误定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Alfabedu 开发者

use thiserror::Error;

/// 流水线中任何一步都不会重试，错误原样交给调用方
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
  #[error("无效图像: {0}")]
  InvalidImage(String),
  #[error("模型不可用: {0}")]
  ModelUnavailable(String),
  #[error("张量形状不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("未知标签: 索引 {index} 超出标签表范围 (长度 {len})")]
  UnknownLabel { index: usize, len: usize },
  #[error("推理失败: {0}")]
  Inference(String),
  #[error("模型地址错误: {0}")]
  InvalidModelUrl(String),
}

impl PipelineError {
  pub fn invalid_image(msg: impl Into<String>) -> Self {
    PipelineError::InvalidImage(msg.into())
  }

  pub fn unavailable(msg: impl Into<String>) -> Self {
    PipelineError::ModelUnavailable(msg.into())
  }

  /// 致命错误意味着本次会话内应停止识别，其余错误只影响当前图像
  pub fn is_fatal(&self) -> bool {
    match self {
      PipelineError::InvalidImage(_) | PipelineError::UnknownLabel { .. } => false,
      PipelineError::ModelUnavailable(_)
      | PipelineError::ShapeMismatch { .. }
      | PipelineError::Inference(_)
      | PipelineError::InvalidModelUrl(_) => true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn per_image_errors_are_not_fatal() {
    assert!(!PipelineError::invalid_image("空图像").is_fatal());
    assert!(!PipelineError::UnknownLabel { index: 60, len: 54 }.is_fatal());
    assert!(PipelineError::unavailable("缺少文件").is_fatal());
    assert!(
      PipelineError::ShapeMismatch {
        expected: 12288,
        actual: 100
      }
      .is_fatal()
    );
  }

  #[test]
  fn shape_mismatch_message_names_both_lengths() {
    let err = PipelineError::ShapeMismatch {
      expected: 12288,
      actual: 100,
    };
    let msg = err.to_string();
    assert!(msg.contains("12288"));
    assert!(msg.contains("100"));
  }
}
