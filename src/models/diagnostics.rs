//! # 解析诊断信息
//!
//! 回退值、被跳过的块、NaN 替换和部分结果都会留下一条诊断，
//! 同时以 `tracing::warn!` 事件输出。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/` 下所有提取器使用
//! - 使用 `tracing` crate

use serde::{Deserialize, Serialize};
use std::fmt;

/// 单条诊断
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 相关物理量名称
    pub quantity: String,
    /// 相关行号（0 起始），整体性问题为 None
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.quantity, line + 1, self.message),
            None => write!(f, "{}: {}", self.quantity, self.message),
        }
    }
}

/// 单次解析内的诊断收集器
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条警告
    pub fn warn(&mut self, quantity: &str, line: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(quantity, line = ?line, "{}", message);
        self.entries.push(Diagnostic {
            quantity: quantity.to_string(),
            line,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 是否有与某物理量相关的诊断
    pub fn mentions(&self, quantity: &str) -> bool {
        self.entries.iter().any(|d| d.quantity == quantity)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
