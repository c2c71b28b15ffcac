//! # 费米能与带边
//!
//! 每个 `E-fermi` 行开启一个窗口，直到下一个 `E-fermi`（最后一个窗口到文件末尾）。
//! 窗口内所有本征值表的 (能量, 占据) 行合并后按能量排序：
//! 占据数绝对值小于 1e-6 的为导带。
//!
//! 一旦某个本征值表上方第 3 行含 `spin component`，之后所有窗口都按
//! 自旋极化处理（前一半行为自旋 1，后一半为自旋 2）。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/tokens.rs`

use crate::models::Diagnostics;
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_float, parse_floats, raw_tokens, tokens};

pub const FERMI_TRIGGER: &str = "E-fermi";
pub const FERMI_LEVEL_TRIGGER: &str = "E-fermi :";
pub const BAND_TRIGGER: &str = "band No.  band energies     occupation";
const SPIN_MARKER: &str = "spin component";

/// 占据数低于此值视为空带
const EMPTY_OCCUPATION: f64 = 1e-6;

/// 每个离子步的费米能和各自旋通道的带边
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandEdges {
    pub e_fermi: Vec<f64>,
    /// [自旋][离子步]
    pub vbm: Vec<Vec<f64>>,
    /// [自旋][离子步]
    pub cbm: Vec<Vec<f64>>,
}

/// 一个自旋通道的 (VBM, CBM)
fn band_edges(mut bands: Vec<(f64, f64)>) -> Option<(f64, f64)> {
    if bands.is_empty() {
        return None;
    }
    bands.sort_by(|a, b| a.0.total_cmp(&b.0));
    let is_empty = |occ: f64| occ.abs() < EMPTY_OCCUPATION;

    let highest = bands[bands.len() - 1].0;
    let cbm = bands
        .iter()
        .find(|(_, occ)| is_empty(*occ))
        .map_or(highest, |(e, _)| *e);
    // 整个通道都是空带时 VBM 取 CBM
    let vbm = bands
        .iter()
        .rev()
        .find(|(_, occ)| !is_empty(*occ))
        .map_or(cbm, |(e, _)| *e);
    Some((vbm, cbm))
}

/// 本征值表从表头下一行开始，直到第一行不是 3 个字段为止
fn table_rows(
    buffer: &LineBuffer,
    header: usize,
    diag: &mut Diagnostics,
) -> Vec<(f64, f64)> {
    let mut rows = Vec::new();
    for i in header + 1..buffer.len() {
        let t = tokens(buffer.get(i).unwrap_or_default());
        if t.len() != 3 {
            break;
        }
        match parse_floats(&t[1..]) {
            Ok(v) => rows.push((v[0], v[1])),
            Err(e) => diag.warn("band_properties", Some(i), format!("{}, row skipped", e)),
        }
    }
    rows
}

/// 费米能序列以及每步、每个自旋通道的 VBM/CBM
pub fn band_properties(buffer: &LineBuffer, diag: &mut Diagnostics) -> BandEdges {
    let fermi = buffer.scan(FERMI_TRIGGER);
    let mut edges = BandEdges::default();

    for &i in &fermi {
        match raw_tokens(buffer.get(i).unwrap_or_default())
            .get(2)
            .map(|t| parse_float(t))
        {
            Some(Ok(e)) => edges.e_fermi.push(e),
            _ => {
                diag.warn("e_fermi_list", Some(i), "malformed Fermi level, NaN substituted");
                edges.e_fermi.push(f64::NAN);
            }
        }
    }

    let mut spin_polarized = false;
    for (n, &start) in fermi.iter().enumerate() {
        let end = fermi.get(n + 1).copied().unwrap_or(buffer.len());
        let mut bands = Vec::new();
        for header in buffer.scan_range(BAND_TRIGGER, start..end) {
            if header >= 3
                && buffer
                    .get(header - 3)
                    .is_some_and(|l| l.contains(SPIN_MARKER))
            {
                spin_polarized = true;
            }
            bands.extend(table_rows(buffer, header, diag));
        }

        let channels = if spin_polarized {
            let second = bands.split_off(bands.len() / 2);
            vec![bands, second]
        } else {
            vec![bands]
        };
        for (spin, channel) in channels.into_iter().enumerate() {
            if edges.vbm.len() <= spin {
                edges.vbm.push(Vec::new());
                edges.cbm.push(Vec::new());
            }
            if let Some((vbm, cbm)) = band_edges(channel) {
                edges.vbm[spin].push(vbm);
                edges.cbm[spin].push(cbm);
            }
        }
    }
    edges
}

/// 最后一次输出的费米能
pub fn fermi_level(buffer: &LineBuffer, diag: &mut Diagnostics) -> Option<f64> {
    let i = buffer.last_match(FERMI_LEVEL_TRIGGER)?;
    let value = buffer
        .get(i)
        .and_then(|l| l.split_once(FERMI_LEVEL_TRIGGER))
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .and_then(|t| parse_float(t).ok());
    if value.is_none() {
        diag.warn("fermi_level", Some(i), "malformed Fermi level");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::outcar::fixture;

    #[test]
    fn test_band_edges_from_fixture() {
        let mut diag = Diagnostics::new();
        let edges = band_properties(&fixture(), &mut diag);

        assert_eq!(edges.e_fermi, vec![5.9447, 6.0012]);
        assert_eq!(edges.vbm, vec![vec![5.0, 5.1], vec![-2.8, 6.1]]);
        assert_eq!(edges.cbm, vec![vec![6.9, 6.8], vec![6.0, 6.1]]);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_empty_spin_channel_sets_vbm_to_cbm() {
        let (vbm, cbm) = band_edges(vec![(7.0, 0.0), (6.5, 0.0), (8.0, 0.0)]).unwrap();
        assert_eq!(cbm, 6.5);
        assert_eq!(vbm, cbm);
    }

    #[test]
    fn test_fully_occupied_channel_uses_highest_band() {
        let (vbm, cbm) = band_edges(vec![(-1.0, 1.0), (2.0, 1.0)]).unwrap();
        assert_eq!(vbm, 2.0);
        assert_eq!(cbm, 2.0);
        assert!(band_edges(Vec::new()).is_none());
    }

    #[test]
    fn test_non_spin_polarized_single_channel() {
        let text = "\
 E-fermi :   1.0000     XC(G=0):  -6.7145     alpha+bet : -4.4637

 k-point     1 :       0.0000    0.0000    0.0000
  band No.  band energies     occupation
      1      -2.0000      2.00000
      2       0.5000      2.00000
      3       3.0000      0.00000

";
        let mut diag = Diagnostics::new();
        let edges = band_properties(&LineBuffer::from_text(text), &mut diag);
        assert_eq!(edges.vbm, vec![vec![0.5]]);
        assert_eq!(edges.cbm, vec![vec![3.0]]);
    }

    #[test]
    fn test_spin_polarized_empty_second_channel() {
        let text = "\
 E-fermi :   0.5000     XC(G=0):  -6.7145     alpha+bet : -4.4637

 spin component 1

 k-point     1 :       0.0000    0.0000    0.0000
  band No.  band energies     occupation
      1      -2.0000      1.00000
      2       1.0000      1.00000
      3       4.0000      0.00000

 spin component 2

 k-point     1 :       0.0000    0.0000    0.0000
  band No.  band energies     occupation
      1      -1.5000      0.00000
      2       2.0000      0.00000
      3       5.0000      0.00000

";
        let mut diag = Diagnostics::new();
        let edges = band_properties(&LineBuffer::from_text(text), &mut diag);

        assert_eq!(edges.e_fermi, vec![0.5]);
        assert_eq!(edges.vbm, vec![vec![1.0], vec![-1.5]]);
        assert_eq!(edges.cbm, vec![vec![4.0], vec![-1.5]]);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_fermi_level_takes_last_occurrence() {
        let mut diag = Diagnostics::new();
        assert_eq!(fermi_level(&fixture(), &mut diag), Some(6.0012));
        assert_eq!(fermi_level(&LineBuffer::default(), &mut diag), None);
        assert!(diag.is_empty());
    }
}
