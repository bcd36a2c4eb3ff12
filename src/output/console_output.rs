// 该文件是 Alfabedu 项目的一部分。
// src/output/console_output.rs - 终端输出
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

use std::convert::Infallible;

use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, input::SourcedFrame, output::Render, pipeline::Recognition,
};

/// 把识别出的字母打印到标准输出
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = Infallible;

  fn from_url(_url: &Url) -> Result<Self, Self::Error> {
    Ok(ConsoleOutput)
  }
}

pub(crate) fn format_candidates(result: &Recognition) -> String {
  result
    .candidates
    .iter()
    .map(|c| format!("{} ({:.2}%)", c.label, c.score * 100.0))
    .collect::<Vec<_>>()
    .join(", ")
}

impl Render<SourcedFrame, Recognition> for ConsoleOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &SourcedFrame, result: &Recognition) -> Result<(), Self::Error> {
    if result.is_recognized() {
      info!(
        "{}: 检测到字母 {} (索引 {}, 置信度 {:.2}%), 候选: {}",
        frame.name,
        result.display_label(),
        result.index,
        result.score * 100.0,
        format_candidates(result)
      );
    } else {
      warn!("{}: 无法识别 (索引 {})", frame.name, result.index);
    }
    println!("{}\t{}", frame.name, result.display_label());
    Ok(())
  }
}
