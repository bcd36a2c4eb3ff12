// 该文件是 Alfabedu 项目的一部分。
// src/model/rknn.rs - RKNN 推理后端
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  model::{Evaluate, LoadModel, ModelOptions},
  tensor::Tensor,
};

const LETTERS_NUM_INPUTS: u32 = 1;
const LETTERS_NUM_OUTPUTS: u32 = 1;

#[derive(Error, Debug)]
pub enum RknnModelError {
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("模型不接受长度为 {len} 的输入: {error}")]
  InputRejected { len: usize, error: rknpu::Error },
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
}

impl From<rknpu::Error> for RknnModelError {
  fn from(err: rknpu::Error) -> Self {
    RknnModelError::RknnError(err)
  }
}

impl RknnModelError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknnModelError::ModelInvalid(msg.to_string(), e)
  }
}

/// 运行在 RKNPU 上的字母分类模型
///
/// 输入输出长度来自加载时对模型文件的一次试推理，而不是来自模型地址。
pub struct RknnModel {
  context: Context,
  input_len: usize,
  output_len: usize,
}

impl LoadModel for RknnModel {
  const SCHEME: &'static str = "rknn";

  fn load(artifact: &[u8], options: &ModelOptions) -> Result<Self, Self::Error> {
    info!("创建 RKNN 推理上下文");
    let context = Context::new(artifact, InitFlags::default())?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(RknnModelError::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknnModelError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknnModelError::invalid("无法获取输出数量", e))?;

    if num_inputs != LETTERS_NUM_INPUTS || num_outputs != LETTERS_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        LETTERS_NUM_INPUTS, LETTERS_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(RknnModelError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    // 边长已在解析模型地址时校验过
    let input_len = options.input_len().unwrap_or_default();
    let mut model = RknnModel {
      context,
      input_len,
      output_len: 0,
    };
    model.output_len = model.calibrate()?;
    debug!(
      "模型输入长度: {}, 输出长度: {}",
      model.input_len, model.output_len
    );

    Ok(model)
  }
}

impl RknnModel {
  /// 用全零输入试跑一次，返回模型实际输出的元素数量
  ///
  /// 模型声明的输入与配置的边长不符时 RKNN 运行时会拒绝这次输入。
  fn calibrate(&mut self) -> Result<usize, RknnModelError> {
    let zeros = Tensor::from(vec![0.0; self.input_len]);
    let len = self.input_len;
    self
      .context
      .set_input(0, &zeros.to_ne_bytes(), TensorFormat::NHWC, TensorType::Float32)
      .and_then(|_| self.context.run())
      .map_err(|e| {
        error!("模型不接受长度为 {} 的输入", len);
        RknnModelError::InputRejected { len, error: e }
      })?;

    let output = self.context.get_outputs()?;
    Ok(output.get_f32(0)?.len())
  }
}

impl Evaluate for RknnModel {
  type Error = RknnModelError;

  fn input_len(&self) -> usize {
    self.input_len
  }

  fn output_len(&self) -> usize {
    self.output_len
  }

  fn evaluate(&mut self, input: &Tensor) -> Result<Vec<f32>, Self::Error> {
    debug!("设置模型输入");
    self.context.set_input(
      0,
      &input.to_ne_bytes(),
      TensorFormat::NHWC,
      TensorType::Float32,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    debug!("获取模型输出");
    let output = self.context.get_outputs()?;
    let scores = output.get_f32(0)?;
    debug!("模型输出长度: {}", scores.len());

    Ok(scores.to_vec())
  }
}
