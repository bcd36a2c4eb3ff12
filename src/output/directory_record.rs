// 该文件是 Alfabedu 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{DateTime, Datelike, Local};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme, input::SourcedFrame, output::Render, pipeline::Recognition,
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存输入图像，并在旁边写一份 JSON 识别记录
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: url_path(uri),
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, now: &DateTime<Local>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn record(
    path: &Path,
    now: &DateTime<Local>,
    frame: &SourcedFrame,
    result: &Recognition,
  ) -> Result<(), DirectoryRecordOutputError> {
    let candidates: Vec<_> = result
      .candidates
      .iter()
      .map(|c| json!({ "label": c.label, "index": c.index, "score": c.score }))
      .collect();

    let record = json!({
      "source": frame.name,
      "recognized": result.is_recognized(),
      "label": result.display_label(),
      "index": result.index,
      "score": result.score,
      "candidates": candidates,
      "width": frame.frame.width(),
      "height": frame.frame.height(),
      "time": now.to_rfc3339(),
    });

    std::fs::write(
      path.with_extension("json"),
      serde_json::to_string_pretty(&record)?,
    )?;
    Ok(())
  }
}

impl Render<SourcedFrame, Recognition> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &SourcedFrame, result: &Recognition) -> Result<(), Self::Error> {
    if !self.always && !result.is_recognized() {
      debug!("{}: 未识别, 不记录", frame.name);
      return Ok(());
    }

    let now = Local::now();
    let path = self.frame_path(&now)?;
    frame.frame.to_rgb_image().save(&path)?;
    Self::record(&path, &now, frame, result)?;
    info!("记录 {} -> {}", frame.name, path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::RgbFrame, label::Candidate};

  fn output_dir(name: &str, query: &str) -> (PathBuf, DirectoryRecordOutput) {
    let dir = std::env::temp_dir().join("alfabedu-record-tests").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    let url = url::Url::parse(&format!("folder://{}{}", dir.display(), query)).unwrap();
    (dir, DirectoryRecordOutput::from_url(&url).unwrap())
  }

  fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
      return found;
    };
    for entry in entries {
      let path = entry.unwrap().path();
      if path.is_dir() {
        found.extend(files_with_extension(&path, ext));
      } else if path.extension().is_some_and(|e| e == ext) {
        found.push(path);
      }
    }
    found
  }

  fn sample(label: Option<&'static str>) -> (SourcedFrame, Recognition) {
    let frame = SourcedFrame {
      name: "foto.jpg".to_string(),
      frame: RgbFrame::filled(4, 3, [255, 0, 0]),
    };
    let result = Recognition {
      label,
      index: 14,
      score: 0.9,
      candidates: vec![Candidate {
        index: 14,
        label: "Ñ",
        score: 0.9,
      }],
    };
    (frame, result)
  }

  #[test]
  fn writes_image_and_json_record() {
    let (dir, output) = output_dir("recognized", "");
    let (frame, result) = sample(Some("Ñ"));
    output.render_result(&frame, &result).unwrap();

    let images = files_with_extension(&dir, "png");
    assert_eq!(images.len(), 1);
    let saved = image::open(&images[0]).unwrap().into_rgb8();
    assert_eq!(saved.dimensions(), (4, 3));

    let records = files_with_extension(&dir, "json");
    assert_eq!(records.len(), 1);
    let record: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&records[0]).unwrap()).unwrap();
    assert_eq!(record["label"], "Ñ");
    assert_eq!(record["index"], 14);
    assert_eq!(record["source"], "foto.jpg");
    assert_eq!(record["recognized"], true);
  }

  #[test]
  fn unrecognized_is_skipped_unless_always() {
    let (dir, output) = output_dir("skipped", "");
    let (frame, result) = sample(None);
    output.render_result(&frame, &result).unwrap();
    assert!(files_with_extension(&dir, "json").is_empty());

    let (dir, output) = output_dir("always", "?always");
    output.render_result(&frame, &result).unwrap();
    let records = files_with_extension(&dir, "json");
    assert_eq!(records.len(), 1);
    let record: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&records[0]).unwrap()).unwrap();
    assert_eq!(record["label"], "Desconocido");
    assert_eq!(record["recognized"], false);
  }

  #[test]
  fn frame_ids_increase() {
    let (_, output) = output_dir("ids", "");
    assert_eq!(output.frame_id(), 1);
    assert_eq!(output.frame_id(), 2);
  }
}
