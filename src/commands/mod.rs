//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑，只调用库接口。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/` 以及库中的 `parsers/`, `models/`, `store/`, `batch/`, `utils/`
//! - 子模块: parse, collect

pub mod collect;
pub mod parse;

use crate::cli::Commands;
use outcarkit::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Parse(args) => parse::execute(args),
        Commands::Collect(args) => collect::execute(args),
    }
}
