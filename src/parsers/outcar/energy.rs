//! # 能量与离子步序列
//!
//! 每个离子步的三种总能、每个电子步的自由能及其分量、步数/时间/温度、
//! 偶极矩和动能误差。
//!
//! 离子步能量块（相对触发行 j）：
//! ```text
//! j    FREE ENERGIE OF THE ION-ELECTRON SYSTEM (eV)
//! j+2  free  energy   TOTEN  =       -5.12345678 eV
//! j+4  energy  without entropy=   -5.11518504  energy(sigma->0) =   -5.11931091
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/steps.rs`, `parsers/tokens.rs`

use super::IONIC_TRIGGER;
use crate::models::{Diagnostics, EnergyComponents, N_ENERGY_COMPONENTS};
use crate::parsers::lines::LineBuffer;
use crate::parsers::steps::partition;
use crate::parsers::tokens::{parse_float, parse_from_end, parse_vec3, tokens};

/// 每个电子步的自由能
pub const ELECTRONIC_TRIGGER: &str = "free energy    TOTEN  =";

/// 每个电子步的自由能分量表
pub const COMPONENTS_TRIGGER: &str = "Free energy of the ion-electron system (eV)";

pub const DIPOLE_TRIGGER: &str = "dipolmoment";

const NBLOCK_TRIGGER: &str = "NBLOCK =";
const POTIM_TRIGGER: &str = "POTIM  =";
const TEMPERATURE_TRIGGER: &str = "kin. lattice  EKIN_LAT= ";
const KIN_ERROR_TRIGGER: &str = "kinetic energy error for atom=";
const IONS_PER_TYPE_TRIGGER: &str = "ions per type =";

/// 分量表中双计数项所在的偏移，它占两个数
const PAW_DOUBLE_COUNTING_OFFSET: usize = 7;

/// 每个离子步的三种总能
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Energies {
    pub free: Vec<f64>,
    pub without_entropy: Vec<f64>,
    pub sigma_zero: Vec<f64>,
}

/// 读取某行某个字段，失败时记录诊断并返回 NaN
fn field_or_nan(
    buffer: &LineBuffer,
    line: usize,
    quantity: &str,
    diag: &mut Diagnostics,
    pick: impl Fn(&[String]) -> Option<f64>,
) -> f64 {
    match buffer.get(line).and_then(|l| pick(&tokens(l))) {
        Some(v) => v,
        None => {
            diag.warn(quantity, Some(line), "missing or malformed value, NaN substituted");
            f64::NAN
        }
    }
}

/// 每个离子步的 TOTEN、不含熵能量和 sigma→0 能量
pub fn energies(buffer: &LineBuffer, ionic: &[usize], diag: &mut Diagnostics) -> Energies {
    let mut result = Energies::default();
    for &j in ionic {
        result.free.push(field_or_nan(buffer, j + 2, "energies", diag, |t| {
            parse_from_end(t, 2).ok()
        }));
        result
            .without_entropy
            .push(field_or_nan(buffer, j + 4, "energies_int", diag, |t| {
                t.get(3).and_then(|v| parse_float(v).ok())
            }));
        result
            .sigma_zero
            .push(field_or_nan(buffer, j + 4, "energies_zero", diag, |t| {
                parse_from_end(t, 1).ok()
            }));
    }
    result
}

/// 每个电子步的自由能，按离子步分组
pub fn scf_energies(
    buffer: &LineBuffer,
    ionic: &[usize],
    electronic: &[usize],
    diag: &mut Diagnostics,
) -> Vec<Vec<f64>> {
    partition(ionic, electronic)
        .into_iter()
        .map(|bucket| {
            bucket
                .into_iter()
                .map(|e| {
                    field_or_nan(buffer, e, "scf_energies", diag, |t| {
                        parse_from_end(t, 2).ok()
                    })
                })
                .collect()
        })
        .collect()
}

/// 单个分量表：偏移 2..=11 各取最后一个数，双计数行取最后两个
fn component_block(buffer: &LineBuffer, start: usize) -> Option<EnergyComponents> {
    let mut values = Vec::with_capacity(N_ENERGY_COMPONENTS);
    for offset in 2..12 {
        let t = tokens(buffer.get(start + offset)?);
        if offset == PAW_DOUBLE_COUNTING_OFFSET {
            values.push(parse_from_end(&t, 2).ok()?);
        }
        values.push(parse_from_end(&t, 1).ok()?);
    }
    values.try_into().ok()
}

/// 每个电子步的自由能分量，按离子步分组
pub fn energy_components(
    buffer: &LineBuffer,
    ionic: &[usize],
    electronic: &[usize],
    diag: &mut Diagnostics,
) -> Vec<Vec<EnergyComponents>> {
    partition(ionic, electronic)
        .into_iter()
        .map(|bucket| {
            bucket
                .into_iter()
                .map(|e| {
                    component_block(buffer, e).unwrap_or_else(|| {
                        diag.warn(
                            "energy_components",
                            Some(e),
                            "malformed component table, NaN substituted",
                        );
                        [f64::NAN; N_ENERGY_COMPONENTS]
                    })
                })
                .collect()
        })
        .collect()
}

/// 紧跟在触发词后面的第一个字段
fn value_after(line: &str, trigger: &str) -> Option<String> {
    let (_, rest) = line.split_once(trigger)?;
    rest.split_whitespace()
        .next()
        .map(|t| t.trim_end_matches(';').to_string())
}

/// 离子步编号：k * NBLOCK
pub fn steps(buffer: &LineBuffer, n_steps: usize, diag: &mut Diagnostics) -> Vec<usize> {
    let n_block = match buffer.first_match(NBLOCK_TRIGGER) {
        Some(i) => match buffer
            .get(i)
            .and_then(|l| value_after(l, NBLOCK_TRIGGER))
            .and_then(|v| v.parse::<usize>().ok())
        {
            Some(n) => n,
            None => {
                diag.warn("steps", Some(i), "unreadable NBLOCK, assuming 1");
                1
            }
        },
        None => 1,
    };
    (0..n_steps).map(|k| k * n_block).collect()
}

/// 模拟时间：POTIM * 步数
pub fn time(buffer: &LineBuffer, steps: &[usize], diag: &mut Diagnostics) -> Vec<f64> {
    let potim = match buffer.first_match(POTIM_TRIGGER) {
        Some(i) => match buffer
            .get(i)
            .and_then(|l| value_after(l, POTIM_TRIGGER))
            .and_then(|v| parse_float(&v).ok())
        {
            Some(p) => p,
            None => {
                diag.warn("time", Some(i), "unreadable POTIM, assuming 1.0");
                1.0
            }
        },
        None => 1.0,
    };
    steps.iter().map(|&s| potim * s as f64).collect()
}

/// MD 温度；非 MD 计算没有触发词，返回全 0
pub fn temperatures(buffer: &LineBuffer, n_steps: usize, diag: &mut Diagnostics) -> Vec<f64> {
    let triggers = buffer.scan(TEMPERATURE_TRIGGER);
    if triggers.is_empty() {
        return vec![0.0; n_steps];
    }
    triggers
        .into_iter()
        .map(|j| {
            field_or_nan(buffer, j, "temperatures", diag, |t| {
                parse_from_end(t, 2).ok()
            })
        })
        .collect()
}

/// 每个电子步的偶极矩，按离子步分组；坏行跳过
pub fn dipole_moments(
    buffer: &LineBuffer,
    ionic: &[usize],
    dipoles: &[usize],
    diag: &mut Diagnostics,
) -> Vec<Vec<[f64; 3]>> {
    partition(ionic, dipoles)
        .into_iter()
        .map(|bucket| {
            bucket
                .into_iter()
                .filter_map(|i| {
                    let parsed = buffer.get(i).map(tokens).map(|t| parse_vec3(&t, 1));
                    match parsed {
                        Some(Ok(v)) => Some(v),
                        _ => {
                            diag.warn(
                                "scf_dipole_moments",
                                Some(i),
                                "malformed dipole line skipped",
                            );
                            None
                        }
                    }
                })
                .collect()
        })
        .collect()
}

/// 动能误差之和：每个元素的误差乘以该元素的原子数
pub fn kinetic_energy_error(buffer: &LineBuffer, diag: &mut Diagnostics) -> f64 {
    let mut errors = Vec::new();
    for i in buffer.scan(KIN_ERROR_TRIGGER) {
        match buffer
            .get(i)
            .and_then(|l| l.split_whitespace().nth(5).map(parse_float))
        {
            Some(Ok(v)) => errors.push(v),
            _ => diag.warn("kin_energy_error", Some(i), "malformed value skipped"),
        }
    }

    let counts: Vec<f64> = buffer
        .last_match(IONS_PER_TYPE_TRIGGER)
        .and_then(|i| buffer.get(i))
        .and_then(|l| l.split_once(IONS_PER_TYPE_TRIGGER))
        .map(|(_, rest)| {
            rest.split_whitespace()
                .filter_map(|v| parse_float(v).ok())
                .collect()
        })
        .unwrap_or_default();

    if counts.is_empty() || counts.len() != errors.len() {
        return 0.0;
    }
    counts.iter().zip(errors.iter()).map(|(n, e)| n * e).sum()
}
