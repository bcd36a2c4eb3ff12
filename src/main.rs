// 该文件是 Alfabedu 项目的一部分。
// src/main.rs - 字母识别命令行程序
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use alfabedu::{
  FromUrl, Pipeline,
  input::InputWrapper,
  model::RknnModel,
  output::OutputWrapper,
  task::{ContinuousTask, OneShotTask, Task},
};
use tracing::info;

/// Alfabedu 手写字母识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，例如 rknn:///opt/alfabedu/letras.rknn?labels=blocked
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  /// 支持:
  /// - 图像文件: image:///path/foto.jpg
  /// - 图像目录: folder:///path/fotos
  /// - 摄像头: v4l:///dev/video0?width=640&height=480
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出: console:// 或 folder:///path/registro[?always]
  #[arg(long, value_name = "OUTPUT", default_value = "console://")]
  pub output: Url,
  /// 只识别第一张图像
  #[arg(long)]
  pub once: bool,
  /// 最多识别的图像数量
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let pipeline: Pipeline<RknnModel> = Pipeline::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  if args.once {
    OneShotTask.run_task(input, pipeline, output)?;
  } else {
    ContinuousTask::default()
      .with_frame_number(args.frame_number)
      .run_task(input, pipeline, output)?;
  }

  Ok(())
}
