// 该文件是 Alfabedu 项目的一部分。
// src/pipeline.rs - 字母识别流水线
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

use tracing::debug;
use url::Url;

use crate::{
  FromUrl,
  error::PipelineError,
  frame::RgbFrame,
  input::SourcedFrame,
  label::{Candidate, LabelTable, UNKNOWN_LABEL},
  model::{Classifier, ClassifierBuilder, Evaluate, LoadModel, Model, ProbabilityVector},
  preprocess::normalize,
  tensor::encode,
};

const CANDIDATE_NUM: usize = 3;

/// 一次识别的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
  /// 识别出的字母，索引超出标签表时为 `None`
  pub label: Option<&'static str>,
  pub index: usize,
  pub score: f32,
  pub candidates: Vec<Candidate>,
}

impl Recognition {
  pub fn is_recognized(&self) -> bool {
    self.label.is_some()
  }

  pub fn display_label(&self) -> &'static str {
    self.label.unwrap_or(UNKNOWN_LABEL)
  }
}

/// 归一化 -> 编码 -> 分类 -> 解码，全程同步
pub struct Pipeline<E: Evaluate> {
  classifier: Classifier<E>,
  labels: LabelTable,
  side: u32,
}

impl<E: Evaluate> Pipeline<E> {
  pub fn open(classifier: Classifier<E>) -> Self {
    let options = *classifier.options();
    Self {
      classifier,
      labels: LabelTable::new(options.label_order),
      side: options.side,
    }
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  /// 识别一张图像中的字母
  pub fn classify_image(&mut self, image: &RgbFrame) -> Result<&'static str, PipelineError> {
    let probabilities = self.score(image)?;
    self.labels.decode(probabilities.scores())
  }

  /// 与 `classify_image` 相同，但超出标签表的结果以未识别返回而不是报错
  pub fn recognize(&mut self, image: &RgbFrame) -> Result<Recognition, PipelineError> {
    let probabilities = self.score(image)?;
    let scores = probabilities.scores();

    let (index, label) = self.labels.pick(scores)?;
    let recognition = Recognition {
      label,
      index,
      score: scores[index],
      candidates: self.labels.top_k(scores, CANDIDATE_NUM),
    };
    debug!("识别结果: {:?}", recognition);

    Ok(recognition)
  }

  fn score(&mut self, image: &RgbFrame) -> Result<ProbabilityVector, PipelineError> {
    let normalized = normalize(image, self.side)?;
    let tensor = encode(&normalized);
    self.classifier.classify(&tensor)
  }

  pub fn close(self) {
    self.classifier.close();
  }
}

impl<E: LoadModel> FromUrl for Pipeline<E> {
  type Error = PipelineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let classifier = ClassifierBuilder::from_url(url)?.build::<E>()?;
    Ok(Pipeline::open(classifier))
  }
}

impl<E: Evaluate> Model for Pipeline<E> {
  type Input = SourcedFrame;
  type Output = Recognition;
  type Error = PipelineError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.recognize(&input.frame)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    label::{LETTER_CLASS_NUM, LabelOrder},
    model::{ModelOptions, testing::FakeModel},
  };

  fn pipeline(model: FakeModel) -> Pipeline<FakeModel> {
    Pipeline::open(Classifier::open(model, ModelOptions::default()).unwrap())
  }

  #[test]
  fn classify_image_end_to_end() {
    let mut pipeline = pipeline(FakeModel::one_hot(26));
    let photo = RgbFrame::filled(640, 480, [255, 255, 255]);
    assert_eq!(pipeline.classify_image(&photo).unwrap(), "Z");
  }

  #[test]
  fn model_sees_normalized_encoded_image() {
    let mut pipeline = pipeline(FakeModel::one_hot(0));
    let photo = RgbFrame::filled(100, 30, [0, 0, 0]);
    pipeline.classify_image(&photo).unwrap();

    let seen = &pipeline.classifier_backend().seen;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 12288);
    assert!(seen[0].iter().all(|&v| v == 0.0));
  }

  #[test]
  fn empty_image_is_rejected_before_inference() {
    let mut pipeline = pipeline(FakeModel::one_hot(0));
    let empty = RgbFrame::new(0, 0, Vec::new()).unwrap();
    assert!(matches!(
      pipeline.classify_image(&empty),
      Err(PipelineError::InvalidImage(_))
    ));
    assert!(pipeline.classifier_backend().seen.is_empty());
  }

  #[test]
  fn label_order_follows_model_options() {
    let options = ModelOptions {
      label_order: LabelOrder::Interleaved,
      ..ModelOptions::default()
    };
    let classifier = Classifier::open(FakeModel::one_hot(1), options).unwrap();
    let mut pipeline = Pipeline::open(classifier);
    let photo = RgbFrame::filled(64, 64, [10, 10, 10]);
    assert_eq!(pipeline.classify_image(&photo).unwrap(), "a");
  }

  #[test]
  fn recognition_reports_candidates() {
    let mut model = FakeModel::one_hot(0);
    model.scores = vec![0.0; LETTER_CLASS_NUM];
    model.scores[4] = 0.7;
    model.scores[31] = 0.2;
    model.scores[9] = 0.1;
    let mut pipeline = pipeline(model);
    let recognition = pipeline
      .recognize(&RgbFrame::filled(8, 8, [0, 0, 0]))
      .unwrap();

    assert_eq!(recognition.label, Some("E"));
    assert_eq!(recognition.index, 4);
    assert_eq!(recognition.score, 0.7);
    let labels: Vec<_> = recognition.candidates.iter().map(|c| c.label).collect();
    assert_eq!(labels, vec!["E", "e", "J"]);
  }

  #[test]
  fn nan_scores_fail_both_entry_points_as_inference() {
    let mut model = FakeModel::one_hot(0);
    model.scores = vec![f32::NAN; LETTER_CLASS_NUM];
    let mut pipeline = pipeline(model);
    let photo = RgbFrame::filled(64, 64, [0, 0, 0]);

    let err = pipeline.classify_image(&photo).unwrap_err();
    assert!(matches!(err, PipelineError::Inference(_)), "{err:?}");
    assert!(matches!(
      pipeline.recognize(&photo),
      Err(PipelineError::Inference(_))
    ));
  }

  #[test]
  fn entry_points_agree_with_label_table() {
    let mut model = FakeModel::one_hot(0);
    model.scores = vec![0.0; LETTER_CLASS_NUM];
    model.scores[2] = 0.5;
    model.scores[29] = 0.5;
    let scores = model.scores.clone();
    let mut pipeline = pipeline(model);
    let photo = RgbFrame::filled(16, 16, [0, 0, 0]);

    let expected = pipeline.labels().decode(&scores).unwrap();
    assert_eq!(pipeline.classify_image(&photo).unwrap(), expected);
    assert_eq!(pipeline.recognize(&photo).unwrap().label, Some(expected));
    assert_eq!(expected, "C");
  }

  #[test]
  fn model_trait_uses_sourced_frame() {
    let mut pipeline = pipeline(FakeModel::one_hot(14));
    let input = SourcedFrame {
      name: "enie.png".to_string(),
      frame: RgbFrame::filled(32, 32, [0, 0, 0]),
    };
    let recognition = pipeline.infer(&input).unwrap();
    assert_eq!(recognition.display_label(), "Ñ");
    assert!(recognition.is_recognized());
  }

  impl<E: Evaluate> Pipeline<E> {
    fn classifier_backend(&self) -> &E {
      self.classifier.backend()
    }
  }
}
