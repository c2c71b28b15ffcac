//! # outcarkit - VASP OUTCAR 结构化解析库
//!
//! 把一次 VASP 运行的 OUTCAR 日志读入内存，按触发词定位各物理量，
//! 对齐到离子步后组装成 `ParsedLog`，并提供分组键值存档的写出/读回。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── parsers/   (行缓冲、触发词扫描、数字修复、各物理量提取器)
//!   ├── models/    (ParsedLog、诊断信息、汇总记录)
//!   ├── store/     (分组键值存档及 JSON 落盘)
//!   ├── settings.rs(解析选项及其版本化存档)
//!   ├── batch/     (目录批量解析)
//!   ├── utils/     (终端输出、进度条)
//!   └── error.rs   (错误处理)
//! ```

pub mod batch;
pub mod error;
pub mod models;
pub mod parsers;
pub mod settings;
pub mod store;
pub mod utils;

pub use error::{OutcarError, Result};
pub use models::{OutcarReport, ParsedLog};
pub use parsers::outcar::{parse_lines, parse_outcar};
pub use settings::ParseSettings;
