// 该文件是 Alfabedu 项目的一部分。
// src/tensor.rs - 模型输入张量编码
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

use crate::frame::{AsNhwcFrame, RgbFrame};

/// f32 输入张量，NHWC 布局，数值范围 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  data: Box<[f32]>,
}

impl Tensor {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 按本机字节序展开，每个浮点数 4 字节
  pub fn to_ne_bytes(&self) -> Vec<u8> {
    self.data.iter().flat_map(|v| v.to_ne_bytes()).collect()
  }
}

impl From<Vec<f32>> for Tensor {
  fn from(data: Vec<f32>) -> Self {
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl AsRef<[f32]> for Tensor {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

/// 将图像编码为模型输入
///
/// 从左上角开始逐行扫描，每个像素依次写入 r/255, g/255, b/255。
/// 这个顺序必须与模型训练时一致。
pub fn encode(image: &RgbFrame) -> Tensor {
  // RgbFrame 本身就是行优先、通道交错的存储
  let data: Vec<f32> = image
    .as_nhwc()
    .iter()
    .map(|&value| (value as f32 / 255.0).clamp(0.0, 1.0))
    .collect();

  Tensor::from(data)
}
