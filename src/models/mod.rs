//! # 数据模型模块
//!
//! 定义 OUTCAR 解析结果、诊断信息和汇总记录。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`store/` 和 `commands/` 使用
//! - 子模块: log, diagnostics, summary

pub mod diagnostics;
pub mod log;
pub mod summary;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use log::{
    EnergyComponents, LocalMoments, Moment, OutcarReport, ParsedLog, Resources, Tensor3,
    N_ENERGY_COMPONENTS,
};
pub use summary::OutcarSummary;
