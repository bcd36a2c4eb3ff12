// 该文件是 Alfabedu 项目的一部分。
// src/model.rs - 模型
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

use std::path::PathBuf;

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  error::PipelineError,
  frame::RGB_CHANNELS,
  label::{LETTER_CLASS_NUM, LabelOrder},
  preprocess::MODEL_INPUT_SIDE,
  tensor::Tensor,
  url_path,
};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 推理后端：固定长度的 f32 输入，固定长度的 f32 输出
pub trait Evaluate {
  type Error: std::error::Error;

  fn input_len(&self) -> usize;
  fn output_len(&self) -> usize;
  fn evaluate(&mut self, input: &Tensor) -> Result<Vec<f32>, Self::Error>;
}

/// 可以从模型文件内容加载的后端
pub trait LoadModel: Evaluate + Sized {
  const SCHEME: &'static str;

  fn load(artifact: &[u8], options: &ModelOptions) -> Result<Self, Self::Error>;
}

/// 每个类别一个分数
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector {
  scores: Box<[f32]>,
}

impl ProbabilityVector {
  pub fn scores(&self) -> &[f32] {
    &self.scores
  }

  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }
}

impl From<Vec<f32>> for ProbabilityVector {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
  pub side: u32,
  pub label_order: LabelOrder,
}

impl Default for ModelOptions {
  fn default() -> Self {
    Self {
      side: MODEL_INPUT_SIDE,
      label_order: LabelOrder::default(),
    }
  }
}

impl ModelOptions {
  /// 输入张量长度 `side * side * 3`，边长为 0 或长度溢出时报错
  pub fn input_len(&self) -> Result<usize, PipelineError> {
    let side = self.side as usize;
    side
      .checked_mul(side)
      .and_then(|n| n.checked_mul(RGB_CHANNELS))
      .filter(|&n| n > 0)
      .ok_or_else(|| PipelineError::InvalidModelUrl(format!("输入边长无效: {}", self.side)))
  }

  /// 从模型 URL 的查询参数中读取 `side` 与 `labels`
  pub fn from_query(url: &Url) -> Result<Self, PipelineError> {
    let mut options = ModelOptions::default();
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "side" => {
          options.side = v.parse().map_err(|_| {
            PipelineError::InvalidModelUrl(format!("无法解析输入边长 '{}'", v))
          })?;
        }
        "labels" => options.label_order = v.parse()?,
        other => debug!("忽略未知的模型参数: {}", other),
      }
    }
    options.input_len()?;
    Ok(options)
  }
}

/// 持有已加载的模型，负责检查输入输出形状
///
/// `classify` 需要 `&mut self`，同一个分类器同一时刻只会有一次推理。
pub struct Classifier<E: Evaluate> {
  backend: E,
  options: ModelOptions,
}

impl<E: Evaluate> Classifier<E> {
  pub fn open(backend: E, options: ModelOptions) -> Result<Self, PipelineError> {
    let expected = options.input_len()?;
    if backend.input_len() != expected {
      return Err(PipelineError::ShapeMismatch {
        expected,
        actual: backend.input_len(),
      });
    }

    if backend.output_len() != LETTER_CLASS_NUM {
      return Err(PipelineError::ShapeMismatch {
        expected: LETTER_CLASS_NUM,
        actual: backend.output_len(),
      });
    }

    info!(
      "分类器就绪: 输入 {}x{}x3, 输出 {} 类",
      options.side, options.side, LETTER_CLASS_NUM
    );
    Ok(Self { backend, options })
  }

  pub fn options(&self) -> &ModelOptions {
    &self.options
  }

  #[cfg(test)]
  pub(crate) fn backend(&self) -> &E {
    &self.backend
  }

  pub fn classify(&mut self, tensor: &Tensor) -> Result<ProbabilityVector, PipelineError> {
    let expected = self.backend.input_len();
    if tensor.len() != expected {
      return Err(PipelineError::ShapeMismatch {
        expected,
        actual: tensor.len(),
      });
    }

    let scores = self
      .backend
      .evaluate(tensor)
      .map_err(|e| PipelineError::Inference(e.to_string()))?;

    let expected = self.backend.output_len();
    if scores.len() != expected {
      return Err(PipelineError::ShapeMismatch {
        expected,
        actual: scores.len(),
      });
    }

    Ok(ProbabilityVector::from(scores))
  }

  /// 显式释放模型
  pub fn close(self) {
    drop(self);
  }
}

impl<E: Evaluate> Drop for Classifier<E> {
  fn drop(&mut self) {
    info!("释放模型");
  }
}

pub struct ClassifierBuilder {
  scheme: String,
  model_path: PathBuf,
  options: ModelOptions,
}

impl FromUrl for ClassifierBuilder {
  type Error = PipelineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let model_path = url_path(url);
    if model_path.as_os_str().is_empty() {
      return Err(PipelineError::InvalidModelUrl(format!(
        "模型地址缺少文件路径: {}",
        url
      )));
    }

    Ok(ClassifierBuilder {
      scheme: url.scheme().to_string(),
      model_path,
      options: ModelOptions::from_query(url)?,
    })
  }
}

impl ClassifierBuilder {
  pub fn options(mut self, options: ModelOptions) -> Self {
    self.options = options;
    self
  }

  pub fn build<E: LoadModel>(self) -> Result<Classifier<E>, PipelineError> {
    if self.scheme != E::SCHEME {
      return Err(PipelineError::unavailable(format!(
        "不支持的模型格式 '{}', 期望 '{}'",
        self.scheme,
        E::SCHEME
      )));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path).map_err(|e| {
      PipelineError::unavailable(format!("无法读取 {}: {}", self.model_path.display(), e))
    })?;
    if model_data.is_empty() {
      return Err(PipelineError::unavailable(format!(
        "模型文件为空: {}",
        self.model_path.display()
      )));
    }
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let backend = E::load(&model_data, &self.options)
      .map_err(|e| PipelineError::unavailable(format!("模型无效: {}", e)))?;
    info!("模型加载完成");

    Classifier::open(backend, self.options)
  }
}

#[cfg(feature = "model_rknn")]
mod rknn;
#[cfg(feature = "model_rknn")]
pub use self::rknn::{RknnModel, RknnModelError};

#[cfg(test)]
pub(crate) mod testing {
  use thiserror::Error;

  use super::*;

  #[derive(Error, Debug)]
  pub enum FakeModelError {
    #[error("不是字母模型")]
    NotLetterModel,
    #[error("推理故障")]
    Broken,
  }

  /// 测试用后端：输出固定分数，并记录收到的输入
  pub struct FakeModel {
    pub input_len: usize,
    pub output_len: usize,
    pub scores: Vec<f32>,
    pub seen: Vec<Vec<f32>>,
    pub broken: bool,
  }

  impl FakeModel {
    pub fn one_hot(index: usize) -> Self {
      let mut scores = vec![0.0; LETTER_CLASS_NUM];
      scores[index] = 1.0;
      Self {
        input_len: ModelOptions::default().input_len().unwrap(),
        output_len: LETTER_CLASS_NUM,
        scores,
        seen: Vec::new(),
        broken: false,
      }
    }
  }

  impl Evaluate for FakeModel {
    type Error = FakeModelError;

    fn input_len(&self) -> usize {
      self.input_len
    }

    fn output_len(&self) -> usize {
      self.output_len
    }

    fn evaluate(&mut self, input: &Tensor) -> Result<Vec<f32>, Self::Error> {
      if self.broken {
        return Err(FakeModelError::Broken);
      }
      self.seen.push(input.as_slice().to_vec());
      Ok(self.scores.clone())
    }
  }

  impl LoadModel for FakeModel {
    const SCHEME: &'static str = "fake";

    /// 文件内容为 `letters:<index>`
    fn load(artifact: &[u8], options: &ModelOptions) -> Result<Self, Self::Error> {
      let text = std::str::from_utf8(artifact).map_err(|_| FakeModelError::NotLetterModel)?;
      let index: usize = text
        .trim()
        .strip_prefix("letters:")
        .and_then(|v| v.parse().ok())
        .ok_or(FakeModelError::NotLetterModel)?;
      let mut model = FakeModel::one_hot(index);
      model.input_len = options.input_len().unwrap_or(0);
      Ok(model)
    }
  }
}
