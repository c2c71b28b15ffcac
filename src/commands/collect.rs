//! # collect 命令实现
//!
//! 并行解析目录中的所有 OUTCAR，每个文件写一行 CSV 汇总。
//!
//! ## 功能
//! - 按文件名模式收集 OUTCAR（可递归）
//! - rayon 并行解析
//! - 终端表格（按每原子能量排序）和 CSV 输出
//!
//! ## 依赖关系
//! - 使用 `cli/collect.rs` 定义的参数
//! - 使用 `batch/`, `parsers/outcar/`, `models/summary.rs`
//! - 使用 `utils/output.rs`

use crate::cli::collect::CollectArgs;
use outcarkit::batch::{BatchRunner, FileCollector, ProcessResult};
use outcarkit::error::{OutcarError, Result};
use outcarkit::models::OutcarSummary;
use outcarkit::parsers::outcar::parse_outcar;
use outcarkit::settings::ParseSettings;
use outcarkit::utils::output;

use std::path::Path;
use tabled::{Table, Tabled};

/// 汇总表行
#[derive(Debug, Clone, Tabled)]
struct CollectRow {
    #[tabled(rename = "Calculation")]
    name: String,
    #[tabled(rename = "Steps")]
    steps: usize,
    #[tabled(rename = "E/atom (eV)")]
    energy_per_atom: String,
    #[tabled(rename = "V/atom (Å³)")]
    volume_per_atom: String,
    #[tabled(rename = "P (kBar)")]
    pressure: String,
    #[tabled(rename = "Done")]
    finished: String,
}

/// 执行 collect 命令
pub fn execute(args: CollectArgs) -> Result<()> {
    output::print_header("Collecting OUTCAR Summaries");

    let files = FileCollector::new(args.dir.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect()?;
    if files.is_empty() {
        return Err(OutcarError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Parsing {} files with {} jobs...",
        files.len(),
        runner.jobs()
    ));

    let settings = args.options.to_settings("outcar");
    let result = runner.run(&files, |path| summarize(path, &args.dir, &settings))?;

    for (path, reason) in &result.skipped {
        output::print_skip(&format!("{}: {}", path, reason));
    }
    for (path, err) in &result.failures {
        output::print_warning(&format!("Failed to parse {}: {}", path, err));
    }

    if result.items.is_empty() {
        output::print_warning("No OUTCAR produced a summary.");
        return Ok(());
    }

    print_table(&result.items, args.top_n);
    save_summary_csv(&result.items, &args.output)?;

    output::print_done(&format!(
        "Summarized {}/{} files into '{}'",
        result.items.len(),
        result.total(),
        args.output.display()
    ));
    Ok(())
}

/// 计算名称：相对根目录的上级目录路径，根目录下的文件用文件名
fn calculation_name(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.display().to_string(),
        _ => relative.display().to_string(),
    }
}

/// 解析单个文件并生成汇总
fn summarize(path: &Path, root: &Path, settings: &ParseSettings) -> ProcessResult<OutcarSummary> {
    let shown = path.display().to_string();
    match parse_outcar(path, settings) {
        Ok(report) if report.log.n_steps() == 0 => {
            ProcessResult::Skipped(shown, "no ionic steps".to_string())
        }
        Ok(report) => {
            if !report.diagnostics.is_empty() {
                tracing::info!(
                    file = %shown,
                    diagnostics = report.diagnostics.len(),
                    "parsed with fallbacks"
                );
            }
            ProcessResult::Success(OutcarSummary::from_log(
                calculation_name(path, root),
                &report.log,
            ))
        }
        Err(e) => ProcessResult::Failed(shown, e.to_string()),
    }
}

/// 按每原子能量排序后打印前 `top_n` 行
fn print_table(summaries: &[OutcarSummary], top_n: usize) {
    let mut sorted: Vec<&OutcarSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| {
        let key = |s: &OutcarSummary| s.energy_per_atom().unwrap_or(f64::INFINITY);
        key(a).total_cmp(&key(b))
    });

    let rows: Vec<CollectRow> = sorted
        .into_iter()
        .take(top_n)
        .map(|s| CollectRow {
            name: s.name.clone(),
            steps: s.ionic_steps,
            energy_per_atom: s
                .energy_per_atom()
                .map_or_else(|| "-".to_string(), |e| format!("{:.6}", e)),
            volume_per_atom: s
                .volume_per_atom()
                .map_or_else(|| "-".to_string(), |v| format!("{:.3}", v)),
            pressure: s
                .pressure_kbar
                .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p)),
            finished: if s.is_finished { "yes" } else { "no" }.to_string(),
        })
        .collect();

    output::print_header(&format!("Lowest {} Energies per Atom", rows.len()));
    println!("{}", Table::new(&rows));
}

/// 保存汇总到 CSV，每个文件一行
fn save_summary_csv(summaries: &[OutcarSummary], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for s in summaries {
        wtr.serialize(s)?;
    }
    wtr.flush().map_err(|e| OutcarError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_calculation_name() {
        let root = PathBuf::from("/runs");
        assert_eq!(
            calculation_name(&root.join("Fe_bcc").join("OUTCAR"), &root),
            "Fe_bcc"
        );
        assert_eq!(calculation_name(&root.join("OUTCAR.1"), &root), "OUTCAR.1");
    }

    #[test]
    fn test_summarize_classifies_logs() {
        let root = std::env::temp_dir().join(format!("outcarkit-collect-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("Fe")).unwrap();
        let relaxed = root.join("Fe").join("OUTCAR");
        std::fs::write(
            &relaxed,
            include_str!("../parsers/outcar/testdata/OUTCAR_fe_relax"),
        )
        .unwrap();
        let unstarted = root.join("OUTCAR.unstarted");
        std::fs::write(&unstarted, "   number of ions     NIONS =         2\n").unwrap();
        let broken = root.join("OUTCAR.broken");
        std::fs::write(&broken, "not a VASP log\n").unwrap();

        let settings = ParseSettings::default();
        match summarize(&relaxed, &root, &settings) {
            ProcessResult::Success(s) => {
                assert_eq!(s.name, "Fe");
                assert_eq!(s.ionic_steps, 2);
                assert!(s.is_finished);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            summarize(&unstarted, &root, &settings),
            ProcessResult::Skipped(_, _)
        ));
        assert!(matches!(
            summarize(&broken, &root, &settings),
            ProcessResult::Failed(_, _)
        ));
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_summary_csv_has_one_row_per_log() {
        let log = outcarkit::ParsedLog {
            energies: vec![-3.0],
            energies_zero: vec![-3.1],
            n_atoms: 1,
            ..Default::default()
        };
        let summaries = vec![
            OutcarSummary::from_log("a", &log),
            OutcarSummary::from_log("b", &log),
        ];
        let path = std::env::temp_dir().join(format!("outcarkit-summary-{}.csv", std::process::id()));
        save_summary_csv(&summaries, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name,is_finished,ionic_steps"));
        assert!(lines[1].starts_with("a,false,1,-3.0,-3.1"));
        std::fs::remove_file(path).unwrap();
    }
}
