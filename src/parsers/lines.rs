//! # 行缓冲与触发词扫描
//!
//! `LineBuffer` 一次性把整个日志读入内存，之后所有提取器只读访问。
//! `scan` 返回修剪后包含给定字面子串的行号（升序，0 起始）。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/` 下所有提取器使用
//! - 无外部模块依赖

use crate::error::{OutcarError, Result};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// 不可变的行序列
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
}

impl LineBuffer {
    /// 从文件读取全部行
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| OutcarError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        // OUTCAR 偶尔混入非 UTF-8 字节（赝势标题等）
        Ok(Self::from_text(&String::from_utf8_lossy(&bytes)))
    }

    /// 从文本内容创建
    pub fn from_text(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// 从已经拆分好的行创建
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 第 `index` 行（越界返回 None）
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// 连续的一段行；不足 `count` 行时返回 None
    pub fn block(&self, start: usize, count: usize) -> Option<&[String]> {
        let end = start.checked_add(count)?;
        self.lines.get(start..end)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// 扫描整个缓冲区，返回修剪后包含 `pattern` 的行号
    pub fn scan(&self, pattern: &str) -> Vec<usize> {
        self.scan_range(pattern, 0..self.lines.len())
    }

    /// 仅在 `range` 内扫描，返回的仍是绝对行号
    pub fn scan_range(&self, pattern: &str, range: Range<usize>) -> Vec<usize> {
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        self.lines[start..end]
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim().contains(pattern))
            .map(|(i, _)| start + i)
            .collect()
    }

    /// 第一个匹配行
    pub fn first_match(&self, pattern: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.trim().contains(pattern))
    }

    /// 最后一个匹配行
    pub fn last_match(&self, pattern: &str) -> Option<usize> {
        self.lines
            .iter()
            .rposition(|line| line.trim().contains(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> LineBuffer {
        LineBuffer::from_text(
            "  free  energy   TOTEN  =  -1.0 eV\n\
             noise\n\
             \x20 free  energy   TOTEN  =  -2.0 eV\n\
             \n\
             free  energy   TOTEN  =  -3.0 eV",
        )
    }

    #[test]
    fn test_scan_ascending_indices() {
        let lines = buffer();
        assert_eq!(lines.scan("free  energy   TOTEN"), vec![0, 2, 4]);
        assert!(lines.scan("not present").is_empty());
    }

    #[test]
    fn test_scan_matches_trimmed_content() {
        let lines = LineBuffer::from_lines(vec!["   gives a total of   3375 points   "]);
        // 模式末尾的空格仍需与行内内容匹配
        assert_eq!(lines.scan("gives a total of "), vec![0]);
        assert!(lines.scan("points   ").is_empty());
    }

    #[test]
    fn test_scan_range_returns_absolute_indices() {
        let lines = buffer();
        assert_eq!(lines.scan_range("TOTEN", 1..5), vec![2, 4]);
        assert_eq!(lines.scan_range("TOTEN", 3..100), vec![4]);
        assert!(lines.scan_range("TOTEN", 10..20).is_empty());
    }

    #[test]
    fn test_first_and_last_match() {
        let lines = buffer();
        assert_eq!(lines.first_match("TOTEN"), Some(0));
        assert_eq!(lines.last_match("TOTEN"), Some(4));
        assert_eq!(lines.first_match("NIONS"), None);
    }

    #[test]
    fn test_lines_and_blocks() {
        let lines = buffer();
        assert_eq!(lines.get(1), Some("noise"));
        assert_eq!(lines.get(5), None);
        assert_eq!(lines.block(1, 2).map(|b| b.len()), Some(2));
        assert!(lines.block(3, 5).is_none());
    }
}
