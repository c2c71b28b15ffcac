//! # 磁矩
//!
//! 单遍扫描缓冲区：
//! - 每个电子步（`eigenvalue-minimisations`）后第 2 行 `magnetization` 之后的
//!   1 个数为共线总磁矩，3 个数为非共线总磁矩；
//! - 出现过 `Atomic Wigner-Seitz radii` 后，每个 `magnetization (x|y|z)` 表头
//!   后第 4 行起的 `n_atoms` 行，取最后一列为局域磁矩。
//!
//! 无法识别的分量个数或坏数值会结束扫描，返回已经收集到的部分结果。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/tokens.rs`

use super::IONIC_TRIGGER;
use crate::models::{Diagnostics, LocalMoments, Moment};
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_floats, parse_from_end, tokens};

const ELECTRONIC_TRIGGER: &str = "eigenvalue-minimisations";
const LOCAL_MOMENTS_ENABLED: &str = "Atomic Wigner-Seitz radii";
const DIRECTIONS: [&str; 3] = ["magnetization (x)", "magnetization (y)", "magnetization (z)"];

/// 磁矩提取结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Magnetization {
    /// 每个电子步的总磁矩，按离子步分组
    pub per_step: Vec<Vec<Moment>>,
    /// 每个离子步的局域磁矩
    pub local: Option<LocalMoments>,
}

/// 扫描中途的累积状态
#[derive(Default)]
struct Accumulator {
    per_step: Vec<Vec<Moment>>,
    current: Vec<Moment>,
    local: [Vec<Vec<f64>>; 3],
}

impl Accumulator {
    fn finish(self, n_atoms: usize) -> Magnetization {
        let [x, y, z] = self.local;
        let local = if x.is_empty() {
            None
        } else if y.is_empty() {
            Some(LocalMoments::Collinear(x))
        } else {
            let steps = x
                .iter()
                .zip(y.iter())
                .zip(z.iter())
                .map(|((x, y), z)| {
                    (0..n_atoms.min(x.len()).min(y.len()).min(z.len()))
                        .map(|a| [x[a], y[a], z[a]])
                        .collect()
                })
                .collect();
            Some(LocalMoments::NonCollinear(steps))
        };
        Magnetization {
            per_step: self.per_step,
            local,
        }
    }
}

/// 电子步总磁矩；`Ok(None)` 表示该步没有磁矩（非自旋极化）
fn total_moment(line: &str) -> Result<Option<Moment>, String> {
    let Some((_, rest)) = line.split_once("magnetization") else {
        return Ok(None);
    };
    let t = tokens(rest);
    let values = parse_floats(&t).map_err(|e| e.to_string())?;
    match values.as_slice() {
        [] => Ok(None),
        [m] => Ok(Some(Moment::Collinear(*m))),
        [x, y, z] => Ok(Some(Moment::NonCollinear([*x, *y, *z]))),
        _ => Err(format!(
            "unrecognized spin configuration with {} values",
            values.len()
        )),
    }
}

fn local_block(buffer: &LineBuffer, header: usize, n_atoms: usize) -> Result<Vec<f64>, String> {
    let rows = buffer
        .block(header + 4, n_atoms)
        .ok_or("local moment table runs past end of file")?;
    rows.iter()
        .map(|row| parse_from_end(&tokens(row), 1).map_err(|e| e.to_string()))
        .collect()
}

/// 总磁矩与局域磁矩
pub fn magnetization(
    buffer: &LineBuffer,
    n_atoms: usize,
    diag: &mut Diagnostics,
) -> Magnetization {
    let mut acc = Accumulator::default();
    let mut local_enabled = false;

    for (i, raw) in buffer.iter().enumerate() {
        let line = raw.trim();
        if line.contains(IONIC_TRIGGER) {
            acc.per_step.push(std::mem::take(&mut acc.current));
        }
        if line.contains(LOCAL_MOMENTS_ENABLED) {
            local_enabled = true;
        }

        if line.contains(ELECTRONIC_TRIGGER) {
            match total_moment(buffer.get(i + 2).unwrap_or_default()) {
                Ok(Some(m)) => acc.current.push(m),
                Ok(None) => {}
                Err(reason) => {
                    diag.warn(
                        "magnetization",
                        Some(i + 2),
                        format!("{}, partial result returned", reason),
                    );
                    return acc.finish(n_atoms);
                }
            }
        }

        if local_enabled {
            for (d, header) in DIRECTIONS.iter().enumerate() {
                if line.contains(header) {
                    match local_block(buffer, i, n_atoms) {
                        Ok(block) => acc.local[d].push(block),
                        Err(reason) => {
                            diag.warn(
                                "final_magmoms",
                                Some(i),
                                format!("{}, partial result returned", reason),
                            );
                            return acc.finish(n_atoms);
                        }
                    }
                }
            }
        }
    }
    acc.finish(n_atoms)
}
