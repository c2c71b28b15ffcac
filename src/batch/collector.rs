//! # 文件收集器
//!
//! 根据输入路径和文件名模式收集待解析的 OUTCAR 列表。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - 逗号分隔的多个 glob 模式（匹配文件名）
//! - 可选递归搜索
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 调用
//! - 使用 `walkdir` 遍历目录, `glob` 匹配文件名

use crate::error::{OutcarError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 默认匹配模式
pub const DEFAULT_PATTERN: &str = "OUTCAR*";

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<glob::Pattern>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器，默认匹配 `OUTCAR*`
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: glob::Pattern::new(DEFAULT_PATTERN).into_iter().collect(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                glob::Pattern::new(s).map_err(|e| {
                    OutcarError::InvalidArgument(format!("Invalid pattern '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件（按路径排序）
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }
        if !self.input.is_dir() {
            return Err(OutcarError::DirectoryNotFound {
                path: self.input.display().to_string(),
            });
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches_patterns(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        tracing::debug!(
            input = %self.input.display(),
            found = files.len(),
            recursive = self.recursive,
            "collected files"
        );
        Ok(files)
    }

    /// 检查文件名是否匹配任一模式
    fn matches_patterns(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("outcarkit-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("relax")).unwrap();
        fs::write(dir.join("OUTCAR"), "").unwrap();
        fs::write(dir.join("OUTCAR.static"), "").unwrap();
        fs::write(dir.join("OSZICAR"), "").unwrap();
        fs::write(dir.join("relax").join("OUTCAR"), "").unwrap();
        dir
    }

    #[test]
    fn test_default_pattern_is_flat() {
        let dir = scratch_dir("flat");
        let files = FileCollector::new(dir.clone()).collect().unwrap();
        assert_eq!(files, vec![dir.join("OUTCAR"), dir.join("OUTCAR.static")]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_recursive_with_multiple_patterns() {
        let dir = scratch_dir("recursive");
        let files = FileCollector::new(dir.clone())
            .with_pattern("OUTCAR, OSZICAR")
            .unwrap()
            .recursive(true)
            .collect()
            .unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.contains(&dir.join("relax").join("OUTCAR")));
        assert!(files.contains(&dir.join("OSZICAR")));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_invalid_pattern_and_missing_directory() {
        assert!(matches!(
            FileCollector::new(PathBuf::from(".")).with_pattern("[OUTCAR"),
            Err(OutcarError::InvalidArgument(_))
        ));
        assert!(matches!(
            FileCollector::new(PathBuf::from("/definitely/not/here")).collect(),
            Err(OutcarError::DirectoryNotFound { .. })
        ));
    }
}
