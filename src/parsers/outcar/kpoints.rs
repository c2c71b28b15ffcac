//! # 不可约 k 点
//!
//! 取最后一次 `IBZKPT` 输出：
//!
//! ```text
//! j     Subroutine IBZKPT returns following result:
//! j+3   Found      2 irreducible k-points:
//! j+7   倒空间分数坐标 + 权重（共 count 行）
//! j+10+count  笛卡尔坐标 + 权重
//! ```
//!
//! 平面波数来自最后一组 `k-point  1 :` 开始的 count 行。
//! IBZKPT 块任何一处读取失败，三项结果全部缺失。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/tokens.rs`, `settings.rs`

use crate::models::Diagnostics;
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_float, parse_vec3, raw_tokens, tokens};
use crate::settings::KpointOptions;

pub const IBZKPT_TRIGGER: &str = "Subroutine IBZKPT returns following result:";
pub const PLANE_WAVE_TRIGGER: &str = "k-point  1 :";

/// 不可约 k 点结果，未请求或无法读取的项为 None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kpoints {
    pub coordinates: Option<Vec<[f64; 3]>>,
    pub weights: Option<Vec<f64>>,
    pub plane_waves: Option<Vec<usize>>,
}

fn kpoint_table(
    buffer: &LineBuffer,
    j: usize,
    reciprocal: bool,
) -> Result<(Vec<[f64; 3]>, Vec<f64>), String> {
    let header = buffer.get(j + 3).ok_or("k-point count line missing")?;
    let count = raw_tokens(header)
        .get(1)
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| format!("cannot read k-point count from '{}'", header.trim()))?;

    let start = if reciprocal { j + 7 } else { j + 10 + count };
    let rows = buffer
        .block(start, count)
        .ok_or("k-point table runs past end of file")?;

    let mut coordinates = Vec::with_capacity(count);
    let mut weights = Vec::with_capacity(count);
    for row in rows {
        let t = tokens(row);
        coordinates.push(parse_vec3(&t, 0).map_err(|e| e.to_string())?);
        let weight = t.get(3).ok_or("k-point weight missing")?;
        weights.push(parse_float(weight).map_err(|e| e.to_string())?);
    }
    Ok((coordinates, weights))
}

fn plane_waves(buffer: &LineBuffer, count: usize) -> Result<Vec<usize>, String> {
    let j = buffer
        .last_match(PLANE_WAVE_TRIGGER)
        .ok_or("plane wave table not found")?;
    let rows = buffer
        .block(j, count)
        .ok_or("plane wave table runs past end of file")?;
    rows.iter()
        .map(|row| {
            raw_tokens(row)
                .last()
                .and_then(|t| t.parse::<usize>().ok())
                .ok_or_else(|| format!("cannot read plane wave count from '{}'", row.trim()))
        })
        .collect()
}

/// 读取不可约 k 点、权重和平面波数
pub fn irreducible_kpoints(
    buffer: &LineBuffer,
    options: &KpointOptions,
    diag: &mut Diagnostics,
) -> Kpoints {
    let Some(j) = buffer.last_match(IBZKPT_TRIGGER) else {
        diag.warn("kpoints", None, "IBZKPT block not found");
        return Kpoints::default();
    };

    let (coordinates, weights) = match kpoint_table(buffer, j, options.reciprocal) {
        Ok(table) => table,
        Err(reason) => {
            diag.warn("kpoints", Some(j), reason);
            return Kpoints::default();
        }
    };

    let plane_waves = if options.plane_waves {
        match plane_waves(buffer, coordinates.len()) {
            Ok(pw) => Some(pw),
            Err(reason) => {
                diag.warn("number_plane_waves", None, reason);
                None
            }
        }
    } else {
        None
    };

    Kpoints {
        coordinates: Some(coordinates),
        weights: options.weights.then_some(weights),
        plane_waves,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::outcar::fixture;

    #[test]
    fn test_reciprocal_kpoints_from_fixture() {
        let mut diag = Diagnostics::new();
        let k = irreducible_kpoints(&fixture(), &KpointOptions::default(), &mut diag);

        assert_eq!(k.coordinates, Some(vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]]));
        assert_eq!(k.weights, Some(vec![1.0, 3.0]));
        assert_eq!(k.plane_waves, Some(vec![135, 128]));
        assert!(diag.is_empty());
    }

    #[test]
    fn test_cartesian_kpoints_without_extras() {
        let options = KpointOptions {
            reciprocal: false,
            weights: false,
            plane_waves: false,
        };
        let mut diag = Diagnostics::new();
        let k = irreducible_kpoints(&fixture(), &options, &mut diag);

        assert_eq!(k.coordinates, Some(vec![[0.0, 0.0, 0.0], [0.174216, 0.0, 0.0]]));
        assert!(k.weights.is_none());
        assert!(k.plane_waves.is_none());
    }

    #[test]
    fn test_missing_block_gives_three_absent_values() {
        let mut diag = Diagnostics::new();
        let k = irreducible_kpoints(
            &LineBuffer::from_text("nothing to see"),
            &KpointOptions::default(),
            &mut diag,
        );
        assert_eq!(k, Kpoints::default());
        assert!(diag.mentions("kpoints"));
    }

    #[test]
    fn test_malformed_row_gives_three_absent_values() {
        let text: Vec<String> = fixture()
            .iter()
            .map(|l| l.replace("0.500000  0.000000  0.000000      3.000000", "0.5000x0  0.0  0.0  3.0"))
            .collect();
        let mut diag = Diagnostics::new();
        let k = irreducible_kpoints(
            &LineBuffer::from_lines(text),
            &KpointOptions::default(),
            &mut diag,
        );
        assert_eq!(k, Kpoints::default());
        assert!(diag.mentions("kpoints"));
    }
}
