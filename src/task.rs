// 该文件是 Alfabedu 项目的一部分。
// src/task.rs - 识别任务
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

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{error::PipelineError, model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 任务结束时的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub frames: usize,
  pub recognized: usize,
  pub skipped: usize,
}

pub struct OneShotTask;

impl<
  F,
  D,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = PipelineError>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始识别...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("识别完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;

    Ok(())
  }
}

pub struct RepeatShotTask {
  times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { times: 1000 }
  }
}

impl RepeatShotTask {
  /// 前两次作为预热，不计入平均
  const WARMUP: usize = 2;

  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times.max(Self::WARMUP + 1);
    self
  }
}

impl<
  F,
  D,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = PipelineError>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始识别...");
    let mut times = Vec::with_capacity(self.times);
    let mut last = None;
    for i in 0..self.times {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})识别完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    warn!(
      "平均识别时间: {:.2?}",
      times.iter().skip(Self::WARMUP).sum::<Duration>() / (times.len() - Self::WARMUP) as u32
    );

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  stop: Option<Arc<AtomicBool>>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 使用外部的停止标志代替 Ctrl-C 处理器
  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = Some(stop);
    self
  }

  pub fn run<
    F,
    D,
    RE: std::error::Error + Sync + Send + 'static,
    I: Iterator<Item = F>,
    M: Model<Input = F, Output = D, Error = PipelineError>,
    O: Render<F, D, Error = RE>,
  >(
    self,
    input: I,
    mut model: M,
    output: O,
  ) -> anyhow::Result<TaskSummary> {
    info!("开始任务...");
    let stop = match self.stop {
      Some(stop) => stop,
      None => {
        let stop = Arc::new(AtomicBool::new(false));
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || {
          info!("收到中断信号，准备退出...");
          handler_stop.store(true, Ordering::SeqCst);
        })?;
        stop
      }
    };

    let mut summary = TaskSummary::default();
    for frame in input {
      summary.frames += 1;
      info!("处理第 {} 张图像", summary.frames);
      let now = Instant::now();
      match model.infer(&frame) {
        Ok(result) => {
          summary.recognized += 1;
          output.render_result(&frame, &result)?;
          info!("识别完成，耗时: {:.2?}", now.elapsed());
        }
        Err(e) if !e.is_fatal() => {
          summary.skipped += 1;
          warn!("跳过第 {} 张图像: {}", summary.frames, e);
        }
        Err(e) => return Err(e.into()),
      }

      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定数量 {}, 退出任务循环", summary.frames);
        break;
      }
      if stop.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成: 共 {} 张, 识别 {} 张, 跳过 {} 张",
      summary.frames, summary.recognized, summary.skipped
    );
    Ok(summary)
  }
}

impl<
  F,
  D,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = PipelineError>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    self.run(input, model, output).map(|_| ())
  }
}
