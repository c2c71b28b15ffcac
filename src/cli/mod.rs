//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `parse`: 解析单个 OUTCAR，打印汇总并可选写出存档
//! - `collect`: 并行解析目录中的所有 OUTCAR，写出 CSV 汇总
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: parse, collect

pub mod collect;
pub mod parse;

use clap::{Parser, Subcommand};

/// outcarkit - VASP OUTCAR 解析工具
#[derive(Parser)]
#[command(name = "outcarkit")]
#[command(version)]
#[command(about = "Structured parser for VASP OUTCAR logs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v: warn, -vv: info, -vvv: debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Parse one OUTCAR, print a summary and optionally dump it to JSON
    Parse(parse::ParseArgs),

    /// Parse every OUTCAR under a directory and write a CSV summary
    Collect(collect::CollectArgs),
}
