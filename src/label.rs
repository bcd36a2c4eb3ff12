// 该文件是 Alfabedu 项目的一部分。
// src/label.rs - 字母标签表与解码
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

use std::str::FromStr;

use crate::error::PipelineError;

/// 模型输出的类别数
pub const LETTER_CLASS_NUM: usize = 54;

/// 无法识别时展示的文字
pub const UNKNOWN_LABEL: &str = "Desconocido";

/// 先大写后小写，Ñ 紧跟在 N 之后
const BLOCKED_LABELS: [&str; LETTER_CLASS_NUM] = [
  "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "Ñ", "O", "P", "Q", "R",
  "S", "T", "U", "V", "W", "X", "Y", "Z", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k",
  "l", "m", "n", "ñ", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z",
];

/// 每个字母大写在前、小写在后
const INTERLEAVED_LABELS: [&str; LETTER_CLASS_NUM] = [
  "A", "a", "B", "b", "C", "c", "D", "d", "E", "e", "F", "f", "G", "g", "H", "h", "I", "i", "J",
  "j", "K", "k", "L", "l", "M", "m", "N", "n", "Ñ", "ñ", "O", "o", "P", "p", "Q", "q", "R", "r",
  "S", "s", "T", "t", "U", "u", "V", "v", "W", "w", "X", "x", "Y", "y", "Z", "z",
];

/// 训练时的标签顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelOrder {
  #[default]
  Blocked,
  Interleaved,
}

impl FromStr for LabelOrder {
  type Err = PipelineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "blocked" => Ok(LabelOrder::Blocked),
      "interleaved" => Ok(LabelOrder::Interleaved),
      other => Err(PipelineError::InvalidModelUrl(format!(
        "未知的标签顺序 '{}', 可选 blocked 或 interleaved",
        other
      ))),
    }
  }
}

/// 一个候选结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub index: usize,
  pub label: &'static str,
  pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTable {
  order: LabelOrder,
  labels: &'static [&'static str; LETTER_CLASS_NUM],
}

impl Default for LabelTable {
  fn default() -> Self {
    LabelTable::new(LabelOrder::default())
  }
}

impl LabelTable {
  pub fn new(order: LabelOrder) -> Self {
    let labels = match order {
      LabelOrder::Blocked => &BLOCKED_LABELS,
      LabelOrder::Interleaved => &INTERLEAVED_LABELS,
    };
    Self { order, labels }
  }

  pub fn order(&self) -> LabelOrder {
    self.order
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&'static str> {
    self.labels.get(index).copied()
  }

  pub fn lookup_or_unknown(&self, index: usize) -> &'static str {
    self.get(index).unwrap_or(UNKNOWN_LABEL)
  }

  /// 取概率最大的标签，并列时取索引最小者
  pub fn decode(&self, scores: &[f32]) -> Result<&'static str, PipelineError> {
    let (index, label) = self.pick(scores)?;
    label.ok_or(PipelineError::UnknownLabel {
      index,
      len: self.len(),
    })
  }

  /// 最大分数的索引及其标签，索引超出标签表时标签为 `None`
  ///
  /// 空向量没有最大值，是形状错误；非空但全部为 NaN 说明模型本身出了问题。
  pub fn pick(&self, scores: &[f32]) -> Result<(usize, Option<&'static str>), PipelineError> {
    if scores.is_empty() {
      return Err(PipelineError::ShapeMismatch {
        expected: self.len(),
        actual: 0,
      });
    }

    let index = argmax(scores)
      .ok_or_else(|| PipelineError::Inference("模型输出全部为 NaN".to_string()))?;
    Ok((index, self.get(index)))
  }

  /// 按分数从高到低取前 `k` 个候选，分数相同时索引小的在前
  ///
  /// 超出标签表的索引会被跳过。
  pub fn top_k(&self, scores: &[f32], k: usize) -> Vec<Candidate> {
    let mut ranked: Vec<(usize, f32)> = scores
      .iter()
      .copied()
      .enumerate()
      .filter(|(_, score)| !score.is_nan())
      .collect();
    // 稳定排序保留原索引顺序
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
      .into_iter()
      .filter_map(|(index, score)| {
        self.get(index).map(|label| Candidate {
          index,
          label,
          score,
        })
      })
      .take(k)
      .collect()
  }
}

/// 最大值所在索引，从左向右扫描，只有严格更大才替换；NaN 永远不会被选中
pub fn argmax(values: &[f32]) -> Option<usize> {
  let mut best: Option<(usize, f32)> = None;
  for (index, &value) in values.iter().enumerate() {
    if value.is_nan() {
      continue;
    }
    match best {
      Some((_, max)) if value <= max => {}
      _ => best = Some((index, value)),
    }
  }
  best.map(|(index, _)| index)
}
