//! # 解析器模块
//!
//! 通用的行缓冲、离子步对齐和数字解析工具，以及 OUTCAR 各物理量的提取器。
//!
//! ## 依赖关系
//! - 被 `commands/`、`batch/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: lines, steps, tokens, outcar

pub mod lines;
pub mod outcar;
pub mod steps;
pub mod tokens;
