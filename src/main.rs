//! # outcarkit - VASP OUTCAR 解析命令行
//!
//! 库 `outcarkit` 的薄命令行外壳。
//!
//! ## 子命令
//! - `parse`   - 解析单个 OUTCAR，打印汇总，可选写出 JSON 存档
//! - `collect` - 并行解析目录中的 OUTCAR，写出 CSV 汇总
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   └── commands/   (命令执行逻辑)
//!         └── outcarkit (库: parsers/, models/, store/, batch/, utils/)
//! ```

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use outcarkit::utils::output;
use tracing_subscriber::EnvFilter;

/// 初始化日志；RUST_LOG 优先，否则按 -v 次数决定级别
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("outcarkit={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = commands::run(cli.command) {
        output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
