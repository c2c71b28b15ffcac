//! # parse 子命令 CLI 定义
//!
//! 解析单个 OUTCAR 文件。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/collect.rs` 使用
//! - 参数传递给 `commands/parse.rs`

use clap::{Args, ValueEnum};
use outcarkit::settings::{KpointOptions, ParseSettings, StressUnit};
use std::path::PathBuf;

/// 应力输出单位
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StressUnitArg {
    /// In-kB row, converted to eV/Å³
    Kbar,
    /// Raw eV row from the force-on-cell block
    Ev,
}

impl From<StressUnitArg> for StressUnit {
    fn from(arg: StressUnitArg) -> Self {
        match arg {
            StressUnitArg::Kbar => StressUnit::KBar,
            StressUnitArg::Ev => StressUnit::Ev,
        }
    }
}

/// 解析选项，parse 与 collect 共用
#[derive(Args, Debug, Clone)]
pub struct ParseOptions {
    /// Which stress row to read
    #[arg(long, value_enum, default_value_t = StressUnitArg::Kbar)]
    pub stress_unit: StressUnitArg,

    /// Report irreducible k-points in cartesian instead of reciprocal coordinates
    #[arg(long, default_value_t = false)]
    pub cartesian_kpoints: bool,

    /// Skip the per-k-point plane wave counts
    #[arg(long, default_value_t = false)]
    pub no_plane_waves: bool,
}

impl ParseOptions {
    /// 组装解析设置
    pub fn to_settings(&self, group: &str) -> ParseSettings {
        ParseSettings {
            stress_unit: self.stress_unit.into(),
            kpoints: KpointOptions {
                reciprocal: !self.cartesian_kpoints,
                weights: true,
                plane_waves: !self.no_plane_waves,
            },
            group: group.to_string(),
        }
    }
}

/// parse 子命令参数
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Path to the OUTCAR file
    pub file: PathBuf,

    #[command(flatten)]
    pub options: ParseOptions,

    /// Load parse settings from a previous dump instead of the flags above
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Write the parsed quantities to this JSON store
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Only dump the reduced quantity set (stresses, k-points, energy components, resources, ...)
    #[arg(long, default_value_t = false, requires = "dump")]
    pub minimal: bool,

    /// Group name used inside the dump
    #[arg(long, default_value = "outcar", env = "OUTCARKIT_GROUP")]
    pub group: String,

    /// Do not print the per-quantity diagnostics
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}
