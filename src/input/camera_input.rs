// 该文件是 Alfabedu 项目的一部分。
// src/input/camera_input.rs - V4L2 摄像头拍照输入
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

use chrono::Local;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, input::SourcedFrame, url_path};

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
// 自动曝光稳定前的帧直接丢弃
const DEFAULT_WARMUP_FRAMES: usize = 5;
const CAPTURE_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("V4L error: {0}")]
  V4lError(#[from] std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
  #[error("Invalid parameter '{0}': {1}")]
  InvalidParameter(String, String),
}

/// 摄像头拍照，每次迭代拍一张
pub struct CameraInput {
  device: Device,
  width: u32,
  height: u32,
  warmup: usize,
  shots: u64,
}

impl FromUrlWithScheme for CameraInput {
  const SCHEME: &'static str = "v4l";
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CameraInputError> {
  value
    .parse()
    .map_err(|_| CameraInputError::InvalidParameter(key.to_string(), value.to_string()))
}

impl FromUrl for CameraInput {
  type Error = CameraInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(CameraInputError::SchemaMismatch);
    }

    // v4l:///dev/video0?width=640&height=480&warmup=5
    let device_path = if url.path().is_empty() || url.path() == "/" {
      DEFAULT_DEVICE.into()
    } else {
      url_path(url)
    };

    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    let mut warmup = DEFAULT_WARMUP_FRAMES;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "width" => width = parse_param(&k, &v)?,
        "height" => height = parse_param(&k, &v)?,
        "warmup" => warmup = parse_param(&k, &v)?,
        _ => {}
      }
    }

    let device = Device::with_path(&device_path)?;

    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;

    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(CameraInputError::UnsupportedPixelFormat(
        format.fourcc.to_string(),
      ));
    }

    info!(
      "打开摄像头 {}: {}x{}",
      device_path.display(),
      format.width,
      format.height
    );

    Ok(CameraInput {
      device,
      width: format.width,
      height: format.height,
      warmup,
      shots: 0,
    })
  }
}

impl CameraInput {
  fn take_photo(&mut self) -> Result<RgbFrame, CameraInputError> {
    let mut stream = Stream::with_buffers(&mut self.device, Type::VideoCapture, CAPTURE_BUFFERS)?;

    for _ in 0..self.warmup {
      stream.next()?;
    }

    let (buffer, meta) = stream.next()?;
    debug!("拍摄完成, 帧序号 {}, {} 字节", meta.sequence, buffer.len());

    let rgb = yuyv_to_rgb(buffer, self.width, self.height);
    RgbFrame::new(self.width, self.height, rgb)
      .map_err(|e| CameraInputError::UnsupportedPixelFormat(e.to_string()))
  }
}

impl Iterator for CameraInput {
  type Item = SourcedFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self.take_photo() {
      Ok(frame) => {
        self.shots += 1;
        Some(SourcedFrame {
          name: format!(
            "camera-{}-{:04}",
            Local::now().format("%Y%m%d-%H%M%S"),
            self.shots
          ),
          frame,
        })
      }
      Err(e) => {
        error!("拍照失败: {}", e);
        None
      }
    }
  }
}

/// 将 YUYV 格式转换为 RGB，只转换前 `width * height` 个像素
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let pixels = (width * height) as usize;
  let mut rgb = Vec::with_capacity(pixels * 3);

  for chunk in yuyv.chunks_exact(4).take(pixels / 2) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn neutral_chroma_is_gray() {
    let rgb = yuyv_to_rgb(&[100, 128, 200, 128], 2, 1);
    assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
  }

  #[test]
  fn conversion_stops_at_frame_size() {
    let yuyv = vec![16u8, 128, 16, 128].repeat(8);
    let rgb = yuyv_to_rgb(&yuyv, 2, 2);
    assert_eq!(rgb.len(), 2 * 2 * 3);
  }

  #[test]
  fn short_buffer_fails_frame_construction() {
    let rgb = yuyv_to_rgb(&[16, 128, 16, 128], 4, 4);
    assert!(RgbFrame::new(4, 4, rgb).is_err());
  }
}
