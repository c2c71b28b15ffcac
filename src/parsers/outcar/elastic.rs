//! # 弹性常数
//!
//! `TOTAL ELASTIC MODULI (kBar)` 只出现一次时，读取其后第 3 行起的 6×6 矩阵，
//! 换算为 GPa。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `parsers/tokens.rs`

use crate::models::Diagnostics;
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_float_fields, tokens};

pub const ELASTIC_TRIGGER: &str = "TOTAL ELASTIC MODULI (kBar)";

const KBAR_PER_GPA: f64 = 10.0;

/// 6×6 弹性常数矩阵 (GPa)；缺失、重复或损坏时为 None
pub fn elastic_constants(buffer: &LineBuffer, diag: &mut Diagnostics) -> Option<[[f64; 6]; 6]> {
    let triggers = buffer.scan(ELASTIC_TRIGGER);
    let j = match triggers.as_slice() {
        [] => return None,
        [j] => *j,
        _ => {
            diag.warn(
                "elastic_constants",
                triggers.first().copied(),
                format!("found {} elastic tensors, expected one", triggers.len()),
            );
            return None;
        }
    };

    let Some(rows) = buffer.block(j + 3, 6) else {
        diag.warn("elastic_constants", Some(j), "elastic tensor runs past end of file");
        return None;
    };
    let mut matrix = [[0.0; 6]; 6];
    for (k, (target, row)) in matrix.iter_mut().zip(rows).enumerate() {
        match parse_float_fields(&tokens(row), 1, 6) {
            Ok(values) => {
                for (t, v) in target.iter_mut().zip(values) {
                    *t = v / KBAR_PER_GPA;
                }
            }
            Err(e) => {
                diag.warn("elastic_constants", Some(j + 3 + k), e.to_string());
                return None;
            }
        }
    }
    Some(matrix)
}
