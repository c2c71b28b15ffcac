//! # collect 子命令 CLI 定义
//!
//! 并行解析目录中所有匹配的 OUTCAR 并写出 CSV 汇总
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/collect.rs`

use super::parse::ParseOptions;
use clap::Args;
use std::path::PathBuf;

/// collect 子命令参数
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Path to the root directory containing VASP calculations
    pub dir: PathBuf,

    /// File name patterns to match (comma separated)
    #[arg(short, long, default_value = "OUTCAR*")]
    pub pattern: String,

    /// Search subdirectories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Filename for the CSV summary
    #[arg(short, long, default_value = "outcar_summary.csv")]
    pub output: PathBuf,

    /// Number of rows to print in the terminal table
    #[arg(long, default_value_t = 20)]
    pub top_n: usize,

    #[command(flatten)]
    pub options: ParseOptions,
}
