// 该文件是 Alfabedu 项目的一部分。
// src/preprocess.rs - 图像尺寸归一化
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

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::{error::PipelineError, frame::RgbFrame};

/// 字母模型的输入边长
pub const MODEL_INPUT_SIDE: u32 = 64;

/// 将任意尺寸的图像双线性缩放为 `target_side x target_side`
pub fn normalize(image: &RgbFrame, target_side: u32) -> Result<RgbFrame, PipelineError> {
  if image.is_empty() {
    return Err(PipelineError::invalid_image(format!(
      "图像尺寸为 {}x{}",
      image.width(),
      image.height()
    )));
  }

  if target_side == 0 {
    return Err(PipelineError::invalid_image("目标边长为 0"));
  }

  if image.width() == target_side && image.height() == target_side {
    return Ok(image.clone());
  }

  debug!(
    "缩放图像: {}x{} -> {}x{}",
    image.width(),
    image.height(),
    target_side,
    target_side
  );

  let resized = imageops::resize(
    &image.to_rgb_image(),
    target_side,
    target_side,
    FilterType::Triangle,
  );

  Ok(RgbFrame::from(resized))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn any_positive_size_becomes_square() {
    for (w, h) in [(1, 1), (7, 3), (64, 64), (640, 480), (3, 200)] {
      let frame = RgbFrame::filled(w, h, [200, 100, 50]);
      let normalized = normalize(&frame, MODEL_INPUT_SIDE).unwrap();
      assert_eq!(normalized.width(), MODEL_INPUT_SIDE);
      assert_eq!(normalized.height(), MODEL_INPUT_SIDE);
    }
  }

  #[test]
  fn uniform_color_survives_resampling() {
    let frame = RgbFrame::filled(128, 96, [200, 100, 50]);
    let normalized = normalize(&frame, 16).unwrap();
    for (x, y) in [(0, 0), (7, 9), (15, 15)] {
      let pixel = normalized.pixel(x, y).unwrap();
      for (got, want) in pixel.iter().zip([200u8, 100, 50]) {
        assert!(got.abs_diff(want) <= 1, "({x}, {y}): {pixel:?}");
      }
    }
  }

  #[test]
  fn rejects_zero_width_or_height() {
    let empty = RgbFrame::new(0, 10, Vec::new()).unwrap();
    assert!(matches!(
      normalize(&empty, MODEL_INPUT_SIDE),
      Err(PipelineError::InvalidImage(_))
    ));

    let flat = RgbFrame::new(10, 0, Vec::new()).unwrap();
    assert!(matches!(
      normalize(&flat, MODEL_INPUT_SIDE),
      Err(PipelineError::InvalidImage(_))
    ));
  }

  #[test]
  fn rejects_zero_target_side() {
    let frame = RgbFrame::filled(4, 4, [0, 0, 0]);
    assert!(matches!(
      normalize(&frame, 0),
      Err(PipelineError::InvalidImage(_))
    ));
  }

  #[test]
  fn target_sized_image_is_unchanged() {
    let frame = RgbFrame::filled(8, 8, [1, 2, 3]);
    assert_eq!(normalize(&frame, 8).unwrap(), frame);
  }
}
