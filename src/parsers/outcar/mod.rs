//! # VASP OUTCAR 解析器
//!
//! 把 OUTCAR 读入 `LineBuffer`，每个触发词只扫描一次，再把行号交给
//! 各个物理量的提取器，最后汇总为 `ParsedLog`。
//!
//! 除离子数和位置/力块尺寸外，任何提取器失败都不会中止整个解析：
//! 失败的物理量降级为缺省值或 NaN，并留下诊断信息。
//!
//! ## 依赖关系
//! - 被 `commands/parse.rs`, `batch/runner.rs` 使用
//! - 使用 `parsers/lines.rs`, `parsers/steps.rs`, `parsers/tokens.rs`
//! - 子模块: energy, structure, stress, kpoints, magnetization, bands, elastic, resources

pub mod bands;
pub mod elastic;
pub mod energy;
pub mod kpoints;
pub mod magnetization;
pub mod resources;
pub mod stress;
pub mod structure;

use crate::error::Result;
use crate::models::{Diagnostics, OutcarReport, ParsedLog};
use crate::parsers::lines::LineBuffer;
use crate::settings::ParseSettings;
use std::path::Path;

/// 离子步触发词，每个离子步结束时出现一次
pub const IONIC_TRIGGER: &str = "FREE ENERGIE OF THE ION-ELECTRON SYSTEM (eV)";

/// kBar → eV/Å³
pub const KBAR_TO_EV_PER_A3: f64 = 6.241509074460763e-4;

/// 找不到 Broyden 混合网格时的回退值
pub const DEFAULT_MIXING_MESH: usize = 0;

/// 解析 OUTCAR 文件
pub fn parse_outcar(path: &Path, settings: &ParseSettings) -> Result<OutcarReport> {
    let buffer = LineBuffer::from_file(path)?;
    tracing::debug!(path = %path.display(), lines = buffer.len(), "loaded OUTCAR");
    parse_lines(&buffer, settings)
}

/// 解析已读入内存的 OUTCAR 内容
pub fn parse_lines(buffer: &LineBuffer, settings: &ParseSettings) -> Result<OutcarReport> {
    let mut diag = Diagnostics::new();

    // 结构性前提，失败直接返回
    let n_atoms = structure::number_of_atoms(buffer)?;
    let force_triggers = buffer.scan(structure::FORCE_TRIGGER);
    let ionic_blocks = structure::positions_and_forces(
        buffer,
        &force_triggers,
        n_atoms,
        structure::ForceMode::Both,
    )?;

    let ionic = buffer.scan(IONIC_TRIGGER);
    let n_steps = ionic.len();

    let energies = energy::energies(buffer, &ionic, &mut diag);
    let scf_energies = energy::scf_energies(
        buffer,
        &ionic,
        &buffer.scan(energy::ELECTRONIC_TRIGGER),
        &mut diag,
    );
    let energy_components = energy::energy_components(
        buffer,
        &ionic,
        &buffer.scan(energy::COMPONENTS_TRIGGER),
        &mut diag,
    );
    let steps = energy::steps(buffer, n_steps, &mut diag);
    let time = energy::time(buffer, &steps, &mut diag);
    let temperatures = energy::temperatures(buffer, n_steps, &mut diag);
    let scf_dipole_moments = energy::dipole_moments(
        buffer,
        &ionic,
        &buffer.scan(energy::DIPOLE_TRIGGER),
        &mut diag,
    );
    let kin_energy_error = energy::kinetic_energy_error(buffer, &mut diag);

    let cell_triggers = buffer.scan(structure::CELL_TRIGGER);
    let cells = structure::cells(buffer, &cell_triggers, &mut diag);
    let volumes = structure::volumes(buffer, &cell_triggers, &mut diag);

    let stresses = stress::stresses(
        buffer,
        &buffer.scan(stress::STRESS_TRIGGER),
        settings.stress_unit,
        &mut diag,
    );
    let pressures = stress::pressures(&stresses, n_steps, &mut diag);

    let kpoints = kpoints::irreducible_kpoints(buffer, &settings.kpoints, &mut diag);
    let magnetization = magnetization::magnetization(buffer, n_atoms, &mut diag);
    let bands = bands::band_properties(buffer, &mut diag);
    let fermi_level = bands::fermi_level(buffer, &mut diag);
    let elastic_constants = elastic::elastic_constants(buffer, &mut diag);

    let log = ParsedLog {
        energies: energies.free,
        energies_int: energies.without_entropy,
        energies_zero: energies.sigma_zero,
        scf_energies,
        energy_components,
        n_atoms,
        positions: ionic_blocks.positions,
        forces: ionic_blocks.forces,
        cells,
        volumes,
        steps,
        time,
        temperatures,
        stresses,
        pressures,
        fermi_level,
        e_fermi_list: bands.e_fermi,
        vbm_list: bands.vbm,
        cbm_list: bands.cbm,
        irreducible_kpoints: kpoints.coordinates,
        irreducible_kpoint_weights: kpoints.weights,
        number_plane_waves: kpoints.plane_waves,
        magnetization: magnetization.per_step,
        final_magmoms: magnetization.local,
        scf_dipole_moments,
        kin_energy_error,
        broyden_mixing: resources::broyden_mixing_mesh(buffer, &mut diag),
        n_elect: resources::number_of_electrons(buffer, &mut diag),
        elastic_constants,
        resources: resources::resources(buffer),
    };

    tracing::debug!(
        steps = n_steps,
        atoms = n_atoms,
        diagnostics = diag.len(),
        unit = ?settings.stress_unit,
        "OUTCAR parsed"
    );

    Ok(OutcarReport {
        log,
        diagnostics: diag.into_vec(),
    })
}

#[cfg(test)]
pub(crate) fn fixture() -> LineBuffer {
    LineBuffer::from_text(include_str!("testdata/OUTCAR_fe_relax"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutcarError;
    use crate::models::{LocalMoments, Moment};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_parse_fixture_energies_and_structure() {
        let report = parse_lines(&fixture(), &ParseSettings::default()).unwrap();
        let log = &report.log;

        assert_eq!(log.n_steps(), 2);
        assert_eq!(log.n_atoms, 2);
        assert_eq!(log.energies, vec![-5.12345678, -5.2]);
        assert_eq!(log.energies_int, vec![-5.11518504, -5.19272826]);
        assert_eq!(log.energies_zero, vec![-5.11931091, -5.19636413]);
        assert_eq!(log.scf_energies, vec![vec![-4.5, -5.12345678], vec![-5.2]]);
        assert_eq!(log.energy_components[0].len(), 2);
        assert_eq!(log.energy_components[1].len(), 1);

        assert_eq!(log.positions.len(), 2);
        assert_eq!(log.positions[1][1], [1.44, 1.44, 1.44]);
        assert_eq!(log.forces[0][0], [0.012345, -0.023456, 0.0]);
        assert_eq!(log.cells[1][2], [0.0, 0.0, 2.88]);
        assert_eq!(log.volumes, vec![23.64, 23.88]);
        assert_eq!(log.steps, vec![0, 1]);
        assert_eq!(log.time, vec![0.0, 0.5]);
        assert_eq!(log.temperatures, vec![0.0, 0.0]);
    }

    #[test]
    fn test_parse_fixture_stress_and_pressure() {
        let report = parse_lines(&fixture(), &ParseSettings::default()).unwrap();
        let log = &report.log;

        assert_eq!(log.stresses.len(), 2);
        assert!(close(log.stresses[0][0][1], 1.0 * KBAR_TO_EV_PER_A3));
        assert!(close(log.stresses[0][0][2], 0.25 * KBAR_TO_EV_PER_A3));
        // 第二步的数值之间没有空格
        assert!(close(log.stresses[1][1][1], -1.5 * KBAR_TO_EV_PER_A3));
        assert!(close(log.pressures[0], -6.0 * KBAR_TO_EV_PER_A3));
        assert!(close(log.pressures[1], -1.5 * KBAR_TO_EV_PER_A3));
    }

    #[test]
    fn test_parse_fixture_electronic_structure() {
        let report = parse_lines(&fixture(), &ParseSettings::default()).unwrap();
        let log = &report.log;

        assert_eq!(log.fermi_level, Some(6.0012));
        assert_eq!(log.e_fermi_list, vec![5.9447, 6.0012]);
        assert_eq!(log.vbm_list, vec![vec![5.0, 5.1], vec![-2.8, 6.1]]);
        assert_eq!(log.cbm_list, vec![vec![6.9, 6.8], vec![6.0, 6.1]]);
        assert_eq!(
            log.magnetization,
            vec![
                vec![Moment::Collinear(4.4), Moment::Collinear(4.41)],
                vec![Moment::Collinear(4.42)]
            ]
        );
        assert_eq!(
            log.final_magmoms,
            Some(LocalMoments::Collinear(vec![vec![2.2, 2.2], vec![2.21, 2.21]]))
        );
        assert_eq!(
            log.irreducible_kpoints,
            Some(vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]])
        );
        assert_eq!(log.irreducible_kpoint_weights, Some(vec![1.0, 3.0]));
        assert_eq!(log.number_plane_waves, Some(vec![135, 128]));
        assert_eq!(log.n_elect, Some(16.0));
    }

    #[test]
    fn test_parse_fixture_misc_quantities() {
        let report = parse_lines(&fixture(), &ParseSettings::default()).unwrap();
        let log = &report.log;

        assert_eq!(log.broyden_mixing, 3375);
        assert!(close(log.kin_energy_error, 0.0024));
        assert_eq!(log.scf_dipole_moments[0].len(), 2);
        assert_eq!(log.scf_dipole_moments[1], vec![[0.0, 0.0, -0.01]]);
        assert!(log.elastic_constants.is_none());
        assert_eq!(log.resources.cpu_time, Some(12.345));
        assert_eq!(log.resources.memory_used, Some(123456.0));
        assert!(log.is_finished());

        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_ion_count_is_fatal() {
        let source = fixture();
        let text: Vec<&str> = source.iter().filter(|l| !l.contains("NIONS")).collect();
        let buffer = LineBuffer::from_lines(text);
        assert!(matches!(
            parse_lines(&buffer, &ParseSettings::default()),
            Err(OutcarError::MissingIonCount)
        ));
    }

    #[test]
    fn test_missing_kpoints_leave_other_quantities() {
        let source = fixture();
        let text: Vec<&str> = source.iter().filter(|l| !l.contains("IBZKPT")).collect();
        let report = parse_lines(&LineBuffer::from_lines(text), &ParseSettings::default()).unwrap();

        assert!(report.log.irreducible_kpoints.is_none());
        assert!(report.log.irreducible_kpoint_weights.is_none());
        assert!(report.log.number_plane_waves.is_none());
        assert_eq!(report.log.energies.len(), 2);
        assert_eq!(report.log.stresses.len(), 2);
        assert!(report.diagnostics.iter().any(|d| d.quantity == "kpoints"));
    }

    #[test]
    fn test_without_stress_pressure_is_zero() {
        let text: Vec<String> = fixture()
            .iter()
            .filter(|l| !l.contains("FORCE on cell"))
            .map(str::to_string)
            .collect();
        let report = parse_lines(&LineBuffer::from_lines(text), &ParseSettings::default()).unwrap();

        assert!(report.log.stresses.is_empty());
        assert_eq!(report.log.pressures, vec![0.0, 0.0]);
        assert!(report.diagnostics.iter().any(|d| d.quantity == "pressures"));
    }
}
