// 该文件是 Alfabedu 项目的一部分。
// src/frame.rs - NHWC RGB 图像帧定义
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

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

use crate::error::PipelineError;

pub const RGB_CHANNELS: usize = 3;

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

/// 8 位 RGB 图像，像素按行优先、通道交错 (R,G,B) 存储
///
/// 构建后不可修改。宽或高为零的帧允许存在，由归一化步骤拒绝。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl RgbFrame {
  pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(PipelineError::invalid_image(format!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        expected,
        data.len()
      )));
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  /// 单色填充的帧
  pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
    let data = rgb.repeat(width as usize * height as usize).into_boxed_slice();
    Self {
      width,
      height,
      data,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
    if x >= self.width || y >= self.height {
      return None;
    }
    let idx = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
    Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    let width = self.width as usize;
    let data = &self.data;

    ImageBuffer::from_fn(self.width, self.height, |x, y| {
      let idx = (y as usize * width + x as usize) * RGB_CHANNELS;
      Rgb([data[idx], data[idx + 1], data[idx + 2]])
    })
  }
}

impl AsNhwcFrame for RgbFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl From<DynamicImage> for RgbFrame {
  fn from(image: DynamicImage) -> Self {
    RgbFrame::from(image.into_rgb8())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_wrong_data_length() {
    let err = RgbFrame::new(2, 2, vec![0; 11]).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidImage(_)));
  }

  #[test]
  fn pixels_are_row_major_interleaved() {
    let frame = RgbFrame::new(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(frame.pixel(0, 0), Some([1, 2, 3]));
    assert_eq!(frame.pixel(1, 0), Some([4, 5, 6]));
    assert_eq!(frame.pixel(2, 0), None);
  }

  #[test]
  fn rgb_image_conversion_keeps_pixels() {
    let mut image = RgbImage::new(3, 2);
    image.put_pixel(2, 1, Rgb([10, 20, 30]));
    let frame = RgbFrame::from(image.clone());
    assert_eq!(frame.pixel(2, 1), Some([10, 20, 30]));
    assert_eq!(frame.to_rgb_image(), image);
  }

  #[test]
  fn zero_sized_frame_is_empty() {
    let frame = RgbFrame::new(0, 5, Vec::new()).unwrap();
    assert!(frame.is_empty());
    assert!(frame.as_nhwc().is_empty());
  }
}
