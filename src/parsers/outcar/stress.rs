//! # 应力张量与压强
//!
//! 应力表的贡献项行数随计算设置变化，所以不能用固定偏移：
//! 从触发行向下找第一条全由 `-` 组成的分隔线，再找第二条，
//! 数值行紧随其后（`Total` 行为 eV，`in kB` 行为 kBar）。
//!
//! ```text
//!   FORCE on cell =-STRESS in cart. coord.  units (eV):
//!   Direction    XX          YY          ZZ          XY          YZ          ZX
//!   ----------------------------------------------------------------------------
//!   Alpha Z     0.46178     0.46178     0.46178
//!   ...
//!   ----------------------------------------------------------------------------
//!   Total        -0.14051    -0.14051    -0.14051     0.00000     0.00000     0.00000
//!   in kB      -9.00000    -6.00000    -3.00000     1.00000     0.50000     0.25000
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/tokens.rs`, `settings.rs`

use super::KBAR_TO_EV_PER_A3;
use crate::models::{Diagnostics, Tensor3};
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_float_fields, tokens};
use crate::settings::StressUnit;

pub const STRESS_TRIGGER: &str = "FORCE on cell =-STRESS in cart. coord.  units (eV):";

const NAN_TENSOR: Tensor3 = [[f64::NAN; 3]; 3];

/// Voigt 顺序 (XX, YY, ZZ, XY, YZ, ZX) → 对称 3×3 张量
pub fn voigt_to_tensor(v: [f64; 6]) -> Tensor3 {
    [[v[0], v[3], v[5]], [v[3], v[1], v[4]], [v[5], v[4], v[2]]]
}

fn is_delimiter(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.chars().all(|c| c == '-')
}

/// 从 `from` 开始的第一条分隔线
fn next_delimiter(buffer: &LineBuffer, from: usize) -> Option<usize> {
    (from..buffer.len()).find(|&i| buffer.get(i).is_some_and(is_delimiter))
}

/// 单个应力块的 6 个分量
fn stress_row(buffer: &LineBuffer, j: usize, unit: StressUnit) -> Result<[f64; 6], String> {
    let first = next_delimiter(buffer, j).ok_or("first delimiter not found")?;
    let second = next_delimiter(buffer, first + 1).ok_or("second delimiter not found")?;
    let (offset, start) = match unit {
        StressUnit::Ev => (1, 1),
        StressUnit::KBar => (2, 2),
    };
    let row = buffer
        .get(second + offset)
        .ok_or("stress row beyond end of file")?;
    let values = parse_float_fields(&tokens(row), start, 6).map_err(|e| e.to_string())?;
    Ok([values[0], values[1], values[2], values[3], values[4], values[5]])
}

/// 每个离子步的应力张量；kBar 读数统一换算为 eV/Å³
pub fn stresses(
    buffer: &LineBuffer,
    triggers: &[usize],
    unit: StressUnit,
    diag: &mut Diagnostics,
) -> Vec<Tensor3> {
    let scale = match unit {
        StressUnit::KBar => KBAR_TO_EV_PER_A3,
        StressUnit::Ev => 1.0,
    };
    triggers
        .iter()
        .map(|&j| match stress_row(buffer, j, unit) {
            Ok(voigt) => voigt_to_tensor(voigt.map(|x| x * scale)),
            Err(reason) => {
                diag.warn("stresses", Some(j), format!("{}, NaN substituted", reason));
                NAN_TENSOR
            }
        })
        .collect()
}

/// 标量压强：张量迹的三分之一；无应力数据时为 `n_steps` 个 0
pub fn pressures(stresses: &[Tensor3], n_steps: usize, diag: &mut Diagnostics) -> Vec<f64> {
    if stresses.is_empty() {
        if n_steps > 0 {
            diag.warn("pressures", None, "no stress data, pressures set to zero");
        }
        return vec![0.0; n_steps];
    }
    stresses
        .iter()
        .map(|s| (s[0][0] + s[1][1] + s[2][2]) / 3.0)
        .collect()
}
