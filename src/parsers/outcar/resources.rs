//! # 计时、内存、混合网格与电子数
//!
//! 作业结束时 VASP 输出的计时汇总，每个计数器独立读取、独立缺失。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/mod.rs` 使用
//! - 使用 `regex` crate, `tracing`

use super::DEFAULT_MIXING_MESH;
use crate::models::{Diagnostics, Resources};
use crate::parsers::lines::LineBuffer;
use crate::parsers::tokens::{parse_float, raw_tokens};
use regex::Regex;
use std::sync::LazyLock;

const CPU_TIME_TRIGGER: &str = "Total CPU time used (sec):";
const USER_TIME_TRIGGER: &str = "User time (sec):";
const SYSTEM_TIME_TRIGGER: &str = "System time (sec):";
const ELAPSED_TIME_TRIGGER: &str = "Elapsed time (sec):";
const MEMORY_TRIGGER: &str = "Maximum memory used (kb):";
const MIXING_MESH_TRIGGER: &str = "gives a total of ";
const NELECT_TRIGGER: &str = "NELECT";

/// 网格行里的维度名（NGX 等），编译一次
static MESH_LETTERS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]"));

/// 第一处匹配行的最后一个数
fn first_last_value(buffer: &LineBuffer, trigger: &str) -> Option<f64> {
    let line = buffer.get(buffer.first_match(trigger)?)?;
    parse_float(raw_tokens(line).last()?).ok()
}

/// 计时与内存计数器
pub fn resources(buffer: &LineBuffer) -> Resources {
    Resources {
        cpu_time: first_last_value(buffer, CPU_TIME_TRIGGER),
        user_time: first_last_value(buffer, USER_TIME_TRIGGER),
        system_time: first_last_value(buffer, SYSTEM_TIME_TRIGGER),
        elapsed_time: first_last_value(buffer, ELAPSED_TIME_TRIGGER),
        memory_used: first_last_value(buffer, MEMORY_TRIGGER),
    }
}

/// `NGX = 15   NGY = 15   NGZ = 15` 形式的行中所有网格维数之积，溢出时为 None
fn mesh_product(line: &str) -> Option<usize> {
    let letters = match MESH_LETTERS.as_ref() {
        Ok(re) => re,
        Err(e) => {
            tracing::error!("mixing mesh pattern failed to compile: {}", e);
            return None;
        }
    };
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = letters.replace_all(&compact, "");
    let mut fields = digits.split('=');
    fields.next()?;
    fields
        .map(|f| f.parse::<usize>().ok())
        .try_fold(1usize, |acc, f| f.and_then(|n| acc.checked_mul(n)))
}

/// Broyden 混合网格点数；读不到时返回 `DEFAULT_MIXING_MESH`
pub fn broyden_mixing_mesh(buffer: &LineBuffer, diag: &mut Diagnostics) -> usize {
    let Some(j) = buffer.first_match(MIXING_MESH_TRIGGER) else {
        diag.warn(
            "broyden_mixing",
            None,
            format!("mixing mesh not found, using {}", DEFAULT_MIXING_MESH),
        );
        return DEFAULT_MIXING_MESH;
    };
    match j
        .checked_sub(2)
        .and_then(|i| buffer.get(i))
        .and_then(mesh_product)
    {
        Some(n) => n,
        None => {
            diag.warn(
                "broyden_mixing",
                Some(j),
                format!("malformed mixing mesh, using {}", DEFAULT_MIXING_MESH),
            );
            DEFAULT_MIXING_MESH
        }
    }
}

/// 第一处 `NELECT` 行的电子数
pub fn number_of_electrons(buffer: &LineBuffer, diag: &mut Diagnostics) -> Option<f64> {
    let i = buffer.first_match(NELECT_TRIGGER)?;
    let value = buffer
        .get(i)
        .and_then(|l| raw_tokens(l).get(2).map(|t| parse_float(t)))
        .and_then(Result::ok);
    if value.is_none() {
        diag.warn("n_elect", Some(i), "malformed electron count");
    }
    value
}
