//! # 单个 OUTCAR 的汇总结果
//!
//! 从 `ParsedLog` 中提取最终能量、压强等少量标量，用于表格和 CSV 输出。
//!
//! ## 依赖关系
//! - 使用 `models/log.rs`
//! - 被 `commands/parse.rs`, `commands/collect.rs` 使用

use super::log::ParsedLog;
use crate::parsers::outcar::KBAR_TO_EV_PER_A3;
use serde::{Deserialize, Serialize};

/// OUTCAR 汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcarSummary {
    /// 计算名称（通常是所在目录名）
    pub name: String,

    /// 计算是否完成
    pub is_finished: bool,

    /// 离子步数
    pub ionic_steps: usize,

    /// 最后一步的自由能 TOTEN (eV)
    pub free_energy_ev: Option<f64>,

    /// 最后一步的 sigma→0 能量 (eV)
    pub energy_ev: Option<f64>,

    /// 最后一步的压强 (kBar)
    pub pressure_kbar: Option<f64>,

    /// 最后一步的体积 (Å³)
    pub volume: Option<f64>,

    /// 原子数
    pub num_atoms: usize,

    /// 费米能 (eV)
    pub fermi_level: Option<f64>,

    /// 墙钟时间 (s)
    pub elapsed_time: Option<f64>,

    /// 峰值内存 (kB)
    pub memory_kb: Option<f64>,
}

impl OutcarSummary {
    pub fn from_log(name: impl Into<String>, log: &ParsedLog) -> Self {
        OutcarSummary {
            name: name.into(),
            is_finished: log.is_finished(),
            ionic_steps: log.n_steps(),
            free_energy_ev: log.energies.last().copied(),
            energy_ev: log.final_energy(),
            // 无应力数据时压强数组为 0，这里不当作真实压强
            pressure_kbar: if log.stresses.is_empty() {
                None
            } else {
                log.final_pressure().map(|p| p / KBAR_TO_EV_PER_A3)
            },
            volume: log.volumes.last().copied(),
            num_atoms: log.n_atoms,
            fermi_level: log.fermi_level,
            elapsed_time: log.resources.elapsed_time,
            memory_kb: log.resources.memory_used,
        }
    }

    /// 计算每原子能量
    pub fn energy_per_atom(&self) -> Option<f64> {
        match (self.energy_ev, self.num_atoms) {
            (Some(e), n) if n > 0 => Some(e / n as f64),
            _ => None,
        }
    }

    /// 计算每原子体积
    pub fn volume_per_atom(&self) -> Option<f64> {
        match (self.volume, self.num_atoms) {
            (Some(v), n) if n > 0 => Some(v / n as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::log::Resources;

    #[test]
    fn test_summary_from_log() {
        let log = ParsedLog {
            energies: vec![-10.0, -12.0],
            energies_zero: vec![-10.5, -12.5],
            n_atoms: 4,
            volumes: vec![40.0, 42.0],
            stresses: vec![[[0.0; 3]; 3]; 2],
            pressures: vec![0.0, 10.0 * KBAR_TO_EV_PER_A3],
            resources: Resources {
                elapsed_time: Some(12.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = OutcarSummary::from_log("Fe_bcc", &log);

        assert!(summary.is_finished);
        assert_eq!(summary.ionic_steps, 2);
        assert_eq!(summary.free_energy_ev, Some(-12.0));
        assert!((summary.energy_per_atom().unwrap() - (-3.125)).abs() < 1e-12);
        assert!((summary.volume_per_atom().unwrap() - 10.5).abs() < 1e-12);
        assert!((summary.pressure_kbar.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_without_stress_has_no_pressure() {
        let log = ParsedLog {
            energies: vec![-1.0],
            pressures: vec![0.0],
            ..Default::default()
        };
        let summary = OutcarSummary::from_log("x", &log);
        assert!(summary.pressure_kbar.is_none());
        assert!(!summary.is_finished);
        assert!(summary.energy_per_atom().is_none());
    }
}
