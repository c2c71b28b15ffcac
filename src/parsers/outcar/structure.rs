//! # 原子数、位置/力与晶胞
//!
//! 离子数是整个解析的前提；位置/力块的行数由它决定，块尺寸不符属于
//! 结构性错误。晶胞块单独失败时只丢弃该块。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/tokens.rs`

use crate::error::{OutcarError, Result};
use crate::models::{Diagnostics, Tensor3};
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_from_end, parse_vec3, tokens, TokenError};

pub const IONS_TRIGGER: &str = "NIONS =";
pub const FORCE_TRIGGER: &str = "TOTAL-FORCE (eV/Angst)";
pub const CELL_TRIGGER: &str = "VOLUME and BASIS-vectors are now :";

/// 读取位置、力或两者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    Positions,
    Forces,
    Both,
}

impl ForceMode {
    fn positions(self) -> bool {
        matches!(self, ForceMode::Positions | ForceMode::Both)
    }

    fn forces(self) -> bool {
        matches!(self, ForceMode::Forces | ForceMode::Both)
    }
}

/// 每个离子步的位置与力；未请求的一项为空
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IonicBlocks {
    pub positions: Vec<Vec<[f64; 3]>>,
    pub forces: Vec<Vec<[f64; 3]>>,
}

/// 第一处 `NIONS =` 之后的整数
pub fn number_of_atoms(buffer: &LineBuffer) -> Result<usize> {
    let line = buffer
        .first_match(IONS_TRIGGER)
        .ok_or(OutcarError::MissingIonCount)?;
    let content = buffer.get(line).unwrap_or_default();
    content
        .split_once(IONS_TRIGGER)
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| OutcarError::InvalidIonCount {
            line: line + 1,
            content: content.trim().to_string(),
        })
}

/// 读取所有 `TOTAL-FORCE` 块，每块 `n_atoms` 行，从触发行后第 2 行开始
pub fn positions_and_forces(
    buffer: &LineBuffer,
    triggers: &[usize],
    n_atoms: usize,
    mode: ForceMode,
) -> Result<IonicBlocks> {
    let mut blocks = IonicBlocks::default();
    for &j in triggers {
        let start = j + 2;
        let rows = buffer.block(start, n_atoms).ok_or_else(|| {
            OutcarError::IonCountMismatch {
                quantity: "positions/forces".to_string(),
                line: j + 1,
                expected: n_atoms,
                found: buffer.len().saturating_sub(start),
            }
        })?;

        let mut positions = Vec::with_capacity(n_atoms);
        let mut forces = Vec::with_capacity(n_atoms);
        for (k, row) in rows.iter().enumerate() {
            let t = tokens(row);
            let malformed = |e: TokenError| OutcarError::MalformedBlock {
                quantity: "positions/forces".to_string(),
                line: start + k + 1,
                reason: e.to_string(),
            };
            if mode.positions() {
                positions.push(parse_vec3(&t, 0).map_err(malformed)?);
            }
            if mode.forces() {
                forces.push(parse_vec3(&t, 3).map_err(malformed)?);
            }
        }
        if mode.positions() {
            blocks.positions.push(positions);
        }
        if mode.forces() {
            blocks.forces.push(forces);
        }
    }
    Ok(blocks)
}

fn cell_block(buffer: &LineBuffer, j: usize) -> Option<Tensor3> {
    let rows = buffer.block(j + 5, 3)?;
    let mut cell = [[0.0; 3]; 3];
    for (row, line) in cell.iter_mut().zip(rows) {
        *row = parse_vec3(&tokens(line), 0).ok()?;
    }
    Some(cell)
}

/// 每个离子步的晶格矢量（行向量），坏块丢弃
pub fn cells(buffer: &LineBuffer, triggers: &[usize], diag: &mut Diagnostics) -> Vec<Tensor3> {
    triggers
        .iter()
        .filter_map(|&j| {
            let cell = cell_block(buffer, j);
            if cell.is_none() {
                diag.warn("cells", Some(j), "malformed lattice vectors, block dropped");
            }
            cell
        })
        .collect()
}

/// 每个离子步的体积，触发行后第 3 行的最后一个数
pub fn volumes(buffer: &LineBuffer, triggers: &[usize], diag: &mut Diagnostics) -> Vec<f64> {
    triggers
        .iter()
        .map(|&j| {
            match buffer
                .get(j + 3)
                .and_then(|l| parse_from_end(&tokens(l), 1).ok())
            {
                Some(v) => v,
                None => {
                    diag.warn("volumes", Some(j + 3), "malformed volume, NaN substituted");
                    f64::NAN
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::outcar::fixture;

    const FORCE_BLOCK: &str = "\
 POSITION                                       TOTAL-FORCE (eV/Angst)
 -----------------------------------------------------------------------------------
      0.00000      0.00000      0.00000         0.100000-0.200000      0.300000
      1.00000      1.00000      1.00000        -0.100000      0.200000     -0.300000
 -----------------------------------------------------------------------------------
";

    #[test]
    fn test_number_of_atoms() {
        assert_eq!(number_of_atoms(&fixture()).unwrap(), 2);
        assert!(matches!(
            number_of_atoms(&LineBuffer::from_text("no ions here")),
            Err(OutcarError::MissingIonCount)
        ));
        assert!(matches!(
            number_of_atoms(&LineBuffer::from_text("   number of ions     NIONS =   two")),
            Err(OutcarError::InvalidIonCount { line: 1, .. })
        ));
    }

    #[test]
    fn test_positions_and_forces_modes() {
        let buffer = LineBuffer::from_text(FORCE_BLOCK);
        let triggers = buffer.scan(FORCE_TRIGGER);

        let both = positions_and_forces(&buffer, &triggers, 2, ForceMode::Both).unwrap();
        assert_eq!(both.positions[0][1], [1.0, 1.0, 1.0]);
        assert_eq!(both.forces[0][0], [0.1, -0.2, 0.3]);

        let forces = positions_and_forces(&buffer, &triggers, 2, ForceMode::Forces).unwrap();
        assert!(forces.positions.is_empty());
        assert_eq!(forces.forces[0][1], [-0.1, 0.2, -0.3]);

        let positions =
            positions_and_forces(&buffer, &triggers, 2, ForceMode::Positions).unwrap();
        assert!(positions.forces.is_empty());
        assert_eq!(positions.positions.len(), 1);
    }

    #[test]
    fn test_force_block_past_end_is_fatal() {
        let buffer = LineBuffer::from_text(FORCE_BLOCK);
        let triggers = buffer.scan(FORCE_TRIGGER);
        assert!(matches!(
            positions_and_forces(&buffer, &triggers, 8, ForceMode::Both),
            Err(OutcarError::IonCountMismatch { expected: 8, .. })
        ));
        // 第 3 行是分隔线，不是数值行
        assert!(matches!(
            positions_and_forces(&buffer, &triggers, 3, ForceMode::Both),
            Err(OutcarError::MalformedBlock { line: 5, .. })
        ));
    }

    #[test]
    fn test_cells_and_volumes_from_fixture() {
        let buffer = fixture();
        let triggers = buffer.scan(CELL_TRIGGER);
        let mut diag = Diagnostics::new();

        let c = cells(&buffer, &triggers, &mut diag);
        assert_eq!(c.len(), 2);
        assert_eq!(c[0], [[2.87, 0.0, 0.0], [0.0, 2.87, 0.0], [0.0, 0.0, 2.87]]);
        assert_eq!(volumes(&buffer, &triggers, &mut diag), vec![23.64, 23.88]);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_bad_cell_block_is_dropped() {
        let text = fixture()
            .iter()
            .map(|l| l.replace("2.880000000  0.000000000  0.000000000", "2.88000000O  0.0  0.0"))
            .collect::<Vec<_>>();
        let buffer = LineBuffer::from_lines(text);
        let mut diag = Diagnostics::new();

        let c = cells(&buffer, &buffer.scan(CELL_TRIGGER), &mut diag);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0][0][0], 2.87);
        assert!(diag.mentions("cells"));
    }
}
