//! # 统一错误处理模块
//!
//! 定义 outcarkit 的所有错误类型，使用 `thiserror` 派生。
//!
//! 只有少数结构性错误会中止整个解析（离子数、位置/力块尺寸、存档版本号），
//! 其余物理量的局部错误在提取器内部降级为缺省值并记录诊断信息。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// outcarkit 统一错误类型
#[derive(Error, Debug)]
pub enum OutcarError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误（仅结构性错误）
    // ─────────────────────────────────────────────────────────────
    #[error("Number of ions could not be resolved: no line contains 'NIONS ='")]
    MissingIonCount,

    #[error("Invalid ion count at line {line}: '{content}'")]
    InvalidIonCount { line: usize, content: String },

    #[error(
        "Ion count mismatch in {quantity} block starting at line {line}: expected {expected} rows, found {found}"
    )]
    IonCountMismatch {
        quantity: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Malformed {quantity} row at line {line}: {reason}")]
    MalformedBlock {
        quantity: String,
        line: usize,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 存档错误
    // ─────────────────────────────────────────────────────────────
    #[error("Cannot handle stored settings version: {0}")]
    UnsupportedVersion(String),

    #[error("Missing node in store: {path}")]
    MissingNode { path: String },

    #[error("Node '{path}' has unexpected type (expected {expected}, found {found})")]
    StoreTypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, OutcarError>;
