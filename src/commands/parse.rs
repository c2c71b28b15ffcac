//! # parse 命令实现
//!
//! 解析单个 OUTCAR，打印汇总表和诊断信息，可选写出完整或精简存档。
//!
//! ## 功能
//! - 解析设置来自命令行参数，或来自已有存档中保存的设置
//! - 终端汇总表
//! - 存档与解析设置写入同一个 JSON 文件
//!
//! ## 依赖关系
//! - 使用 `cli/parse.rs` 定义的参数
//! - 使用 `parsers/outcar/`, `store/`, `settings.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::parse::ParseArgs;
use outcarkit::error::{OutcarError, Result};
use outcarkit::models::{Moment, OutcarSummary, ParsedLog};
use outcarkit::parsers::outcar::parse_outcar;
use outcarkit::settings::ParseSettings;
use outcarkit::store::MemoryStore;
use outcarkit::utils::{output, progress};

use tabled::{Table, Tabled};

/// 汇总表的一行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Quantity")]
    quantity: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(quantity: &'static str, value: String) -> SummaryRow {
    SummaryRow { quantity, value }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

/// 执行 parse 命令
pub fn execute(args: ParseArgs) -> Result<()> {
    output::print_header("Parsing OUTCAR");

    if !args.file.exists() {
        return Err(OutcarError::FileNotFound {
            path: args.file.display().to_string(),
        });
    }

    let settings = match &args.settings {
        Some(path) => {
            let store = MemoryStore::load_json(path)?;
            let settings = ParseSettings::from_store(&store, &args.group)?;
            output::print_info(&format!(
                "Loaded settings from '{}' (stress unit: {})",
                path.display(),
                settings.stress_unit
            ));
            settings
        }
        None => args.options.to_settings(&args.group),
    };

    let spinner = progress::create_spinner(&format!("Reading {}", args.file.display()));
    let parsed = parse_outcar(&args.file, &settings);
    spinner.finish_and_clear();
    let report = parsed?;

    let rows = summary_rows(&args.file.display().to_string(), &report.log);
    println!("{}", Table::new(&rows));

    if report.diagnostics.is_empty() {
        output::print_success("All quantities parsed without fallbacks");
    } else {
        output::print_warning(&format!(
            "{} quantities fell back to defaults or partial results",
            report.diagnostics.len()
        ));
        if !args.quiet {
            output::print_separator();
            for d in &report.diagnostics {
                output::print_diagnostic(d);
            }
            output::print_separator();
        }
    }

    if let Some(dump) = &args.dump {
        let mut store = MemoryStore::new();
        if args.minimal {
            report.log.to_store_minimal(&mut store, &settings.group)?;
        } else {
            report.log.to_store(&mut store, &settings.group)?;
        }
        settings.to_store(&mut store, &settings.group)?;
        store.save_json(dump)?;
        output::print_done(&format!(
            "Wrote {} nodes to '{}'",
            store.len(),
            dump.display()
        ));
    }

    Ok(())
}

/// 终端汇总表内容
fn summary_rows(name: &str, log: &ParsedLog) -> Vec<SummaryRow> {
    let summary = OutcarSummary::from_log(name, log);
    let final_moment = log
        .magnetization
        .iter()
        .rev()
        .find_map(|step| step.last())
        .map(|m| match m {
            Moment::Collinear(v) => format!("{:.4}", v),
            Moment::NonCollinear([x, y, z]) => format!("({:.4}, {:.4}, {:.4})", x, y, z),
        })
        .unwrap_or_else(|| "-".to_string());

    vec![
        row("File", summary.name.clone()),
        row("Finished", summary.is_finished.to_string()),
        row("Ionic steps", summary.ionic_steps.to_string()),
        row("Atoms", summary.num_atoms.to_string()),
        row("Free energy TOTEN (eV)", fmt_opt(summary.free_energy_ev, 6)),
        row("Energy sigma->0 (eV)", fmt_opt(summary.energy_ev, 6)),
        row("Energy per atom (eV)", fmt_opt(summary.energy_per_atom(), 6)),
        row("Pressure (kBar)", fmt_opt(summary.pressure_kbar, 3)),
        row("Volume (Å³)", fmt_opt(summary.volume, 3)),
        row("Fermi level (eV)", fmt_opt(summary.fermi_level, 4)),
        row("Electrons", fmt_opt(log.n_elect, 2)),
        row("Total magnetization (μB)", final_moment),
        row(
            "Local moment sum (μB)",
            fmt_opt(log.final_magmoms.as_ref().and_then(|m| m.final_total()), 4),
        ),
        row(
            "Irreducible k-points",
            log.irreducible_kpoints
                .as_ref()
                .map_or_else(|| "-".to_string(), |k| k.len().to_string()),
        ),
        row("Elapsed time (s)", fmt_opt(summary.elapsed_time, 1)),
        row("Max memory (kB)", fmt_opt(summary.memory_kb, 0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcarkit::models::LocalMoments;

    #[test]
    fn test_summary_rows_show_final_moments() {
        let log = ParsedLog {
            energies: vec![-5.0, -5.5],
            energies_zero: vec![-5.1, -5.6],
            n_atoms: 2,
            magnetization: vec![
                vec![Moment::Collinear(4.0)],
                vec![Moment::Collinear(4.2), Moment::Collinear(4.4)],
            ],
            final_magmoms: Some(LocalMoments::Collinear(vec![vec![2.0, 2.25]])),
            ..Default::default()
        };
        let rows = summary_rows("OUTCAR", &log);
        let value = |q: &str| {
            rows.iter()
                .find(|r| r.quantity == q)
                .map(|r| r.value.clone())
                .unwrap()
        };

        assert_eq!(value("Ionic steps"), "2");
        assert_eq!(value("Free energy TOTEN (eV)"), "-5.500000");
        assert_eq!(value("Energy per atom (eV)"), "-2.800000");
        assert_eq!(value("Total magnetization (μB)"), "4.4000");
        assert_eq!(value("Local moment sum (μB)"), "4.2500");
        assert_eq!(value("Pressure (kBar)"), "-");
    }
}
