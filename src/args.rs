// 该文件是 Yebing（叶病）项目的一部分。
// src/args.rs - 命令行参数
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use yebing::geometry::Dims;

/// Yebing 叶片病害检测：多轮增强推理结果的解码与投票合并
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型描述，例如 builtin://plant 或 profile:///path/to/profile.json
  #[arg(long, value_name = "MODEL", default_value = "builtin://plant")]
  pub model: Url,

  /// 推理会话，例如 replay:///path/to/outputs
  #[arg(long, value_name = "SESSION")]
  pub session: Url,

  /// 输入图像，例如 image:///path/to/leaf.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Option<Url>,

  /// 原图尺寸 WxH（未提供输入图像时必填）
  #[arg(long, value_name = "WxH")]
  pub original: Option<Dims>,

  /// 显示尺寸 WxH，默认与原图相同
  #[arg(long, value_name = "WxH")]
  pub display: Option<Dims>,

  /// 增强轮数上限
  #[arg(long, value_name = "N")]
  pub passes: Option<usize>,

  /// 检测参数配置文件（JSON）
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 只对原图推理一次，不做投票
  #[arg(long)]
  pub single_pass: bool,

  /// 输出，例如 json://stdout、json:///tmp/report.json、image:///tmp/result.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,
}
