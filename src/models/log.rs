//! # OUTCAR 解析结果数据模型
//!
//! `ParsedLog` 是固定结构的结果记录：每个物理量一个字段，可能缺失的量用
//! `Option` 表示。单位与 VASP 输出一致，应力与压强除外（eV/Å³）。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/` 填充
//! - 被 `store/outcar.rs` 读写
//! - 被 `models/summary.rs` 汇总

use super::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};

/// 3×3 张量（晶胞矩阵、应力）
pub type Tensor3 = [[f64; 3]; 3];

/// 每个电子步的自由能分量数
pub const N_ENERGY_COMPONENTS: usize = 11;

/// 自由能分量，顺序：PSCENC, TEWEN, DENC, EXHF, XCENC, PAW 双计数 (两项),
/// EENTRO, EBANDS, EATOM, Ediel_sol
pub type EnergyComponents = [f64; N_ENERGY_COMPONENTS];

/// 单个电子步的总磁矩
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Moment {
    /// ISPIN = 2 共线计算
    Collinear(f64),
    /// 非共线计算 (x, y, z)
    NonCollinear([f64; 3]),
}

/// 每个离子步、每个原子的局域磁矩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocalMoments {
    /// 只有 x 分量：[离子步][原子]
    Collinear(Vec<Vec<f64>>),
    /// x/y/z 三个分量：[离子步][原子][3]
    NonCollinear(Vec<Vec<[f64; 3]>>),
}

impl LocalMoments {
    /// 离子步数
    pub fn n_steps(&self) -> usize {
        match self {
            LocalMoments::Collinear(m) => m.len(),
            LocalMoments::NonCollinear(m) => m.len(),
        }
    }

    /// 最后一步的总局域磁矩
    pub fn final_total(&self) -> Option<f64> {
        match self {
            LocalMoments::Collinear(m) => m.last().map(|atoms| atoms.iter().sum()),
            LocalMoments::NonCollinear(m) => m.last().map(|atoms| {
                let total = atoms.iter().fold([0.0; 3], |acc, v| {
                    [acc[0] + v[0], acc[1] + v[1], acc[2] + v[2]]
                });
                (total[0].powi(2) + total[1].powi(2) + total[2].powi(2)).sqrt()
            }),
        }
    }
}

/// 计时与资源计数器，缺失的计数器互不影响
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// 总 CPU 时间 (s)
    pub cpu_time: Option<f64>,
    /// 用户态时间 (s)
    pub user_time: Option<f64>,
    /// 内核态时间 (s)
    pub system_time: Option<f64>,
    /// 墙钟时间 (s)
    pub elapsed_time: Option<f64>,
    /// 峰值内存 (kB)
    pub memory_used: Option<f64>,
}

/// 一次 OUTCAR 解析的全部物理量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedLog {
    /// 每个离子步的自由能 TOTEN (eV)
    pub energies: Vec<f64>,
    /// 不含熵的能量 (eV)
    pub energies_int: Vec<f64>,
    /// sigma→0 外推能量 (eV)
    pub energies_zero: Vec<f64>,
    /// 每个电子步的自由能：[离子步][电子步]
    pub scf_energies: Vec<Vec<f64>>,
    /// 每个电子步的自由能分量：[离子步][电子步][分量]
    pub energy_components: Vec<Vec<EnergyComponents>>,

    /// 原子数
    pub n_atoms: usize,
    /// 笛卡尔坐标 (Å)：[离子步][原子][3]
    pub positions: Vec<Vec<[f64; 3]>>,
    /// 原子受力 (eV/Å)：[离子步][原子][3]
    pub forces: Vec<Vec<[f64; 3]>>,
    /// 晶格矢量 (Å)，行向量
    pub cells: Vec<Tensor3>,
    /// 晶胞体积 (Å³)
    pub volumes: Vec<f64>,

    /// 离子步编号（乘以 NBLOCK）
    pub steps: Vec<usize>,
    /// 模拟时间 (fs)
    pub time: Vec<f64>,
    /// 温度 (K)，非 MD 计算为 0
    pub temperatures: Vec<f64>,

    /// 应力张量 (eV/Å³)
    pub stresses: Vec<Tensor3>,
    /// 标量压强 (eV/Å³)
    pub pressures: Vec<f64>,

    /// 最后一次的费米能 (eV)
    pub fermi_level: Option<f64>,
    /// 每个离子步的费米能 (eV)
    pub e_fermi_list: Vec<f64>,
    /// 价带顶：[自旋][离子步]
    pub vbm_list: Vec<Vec<f64>>,
    /// 导带底：[自旋][离子步]
    pub cbm_list: Vec<Vec<f64>>,

    /// 不可约 k 点坐标
    pub irreducible_kpoints: Option<Vec<[f64; 3]>>,
    /// 不可约 k 点权重
    pub irreducible_kpoint_weights: Option<Vec<f64>>,
    /// 每个 k 点的平面波数
    pub number_plane_waves: Option<Vec<usize>>,

    /// 每个电子步的总磁矩：[离子步][电子步]
    pub magnetization: Vec<Vec<Moment>>,
    /// 局域磁矩
    pub final_magmoms: Option<LocalMoments>,

    /// 每个电子步的偶极矩 (e·Å)：[离子步][电子步][3]
    pub scf_dipole_moments: Vec<Vec<[f64; 3]>>,
    /// 动能误差总和 (eV)
    pub kin_energy_error: f64,
    /// Broyden 混合网格点数
    pub broyden_mixing: usize,
    /// 电子数
    pub n_elect: Option<f64>,
    /// 弹性常数 (GPa)
    pub elastic_constants: Option<[[f64; 6]; 6]>,

    /// 计时与内存
    pub resources: Resources,
}

impl ParsedLog {
    /// 离子步数
    pub fn n_steps(&self) -> usize {
        self.energies.len()
    }

    /// 最后一个离子步的 sigma→0 能量
    pub fn final_energy(&self) -> Option<f64> {
        self.energies_zero.last().copied()
    }

    /// 最后一个离子步的压强 (eV/Å³)
    pub fn final_pressure(&self) -> Option<f64> {
        self.pressures.last().copied()
    }

    /// 计算是否正常结束（计时汇总只在作业结束时输出）
    pub fn is_finished(&self) -> bool {
        self.resources.elapsed_time.is_some()
    }
}

/// 解析结果及过程中产生的诊断信息
#[derive(Debug, Clone, Default)]
pub struct OutcarReport {
    pub log: ParsedLog,
    pub diagnostics: Vec<Diagnostic>,
}
