//! # ParsedLog 的存档读写
//!
//! 每个物理量一个节点，计时计数器放在 `resources/` 子组下。
//! 完整写入包含所有节点；精简写入只包含其他输出文件里没有的量。
//! 读取时缺失的节点取默认值，所以精简存档也能读回。
//!
//! ## 依赖关系
//! - 使用 `store/mod.rs`, `models/log.rs`
//! - 被 `commands/parse.rs` 使用

use super::{
    as_f64, as_float_array, as_i64, as_int_array, as_ragged, join, mismatch, GroupStore, Value,
};
use crate::error::{OutcarError, Result};
use crate::models::{
    EnergyComponents, LocalMoments, Moment, ParsedLog, Resources, Tensor3, N_ENERGY_COMPONENTS,
};

/// 精简存档包含的节点（及子组）
pub const MINIMAL_KEYS: [&str; 8] = [
    "kin_energy_error",
    "broyden_mixing",
    "stresses",
    "irreducible_kpoints",
    "irreducible_kpoint_weights",
    "number_plane_waves",
    "energy_components",
    "resources",
];

// ─────────────────────────────────────────────────────────────
// 写入
// ─────────────────────────────────────────────────────────────

fn opt_float(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Float)
}

fn ints(values: impl IntoIterator<Item = usize>) -> Value {
    let data: Vec<i64> = values.into_iter().map(|v| v as i64).collect();
    Value::IntArray {
        shape: vec![data.len()],
        data,
    }
}

fn ragged_floats(rows: &[Vec<f64>]) -> Value {
    Value::Ragged(rows.iter().map(|r| Value::floats(r.clone())).collect())
}

/// [离子步][原子][3]，每步原子数相同
fn per_atom_vectors(steps: &[Vec<[f64; 3]>]) -> Value {
    let atoms = steps.first().map_or(0, Vec::len);
    Value::FloatArray {
        shape: vec![steps.len(), atoms, 3],
        data: steps.iter().flatten().flatten().copied().collect(),
    }
}

fn moment(m: &Moment) -> Value {
    match m {
        Moment::Collinear(v) => Value::Float(*v),
        Moment::NonCollinear(v) => Value::floats(v.to_vec()),
    }
}

fn local_moments(m: &LocalMoments) -> Value {
    match m {
        LocalMoments::Collinear(steps) => ragged_floats(steps),
        LocalMoments::NonCollinear(steps) => {
            Value::Ragged(steps.iter().map(|s| Value::float_rows(s)).collect())
        }
    }
}

impl ParsedLog {
    /// 所有节点，按名称列出
    fn entries(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("energies", Value::floats(self.energies.clone())),
            ("energies_int", Value::floats(self.energies_int.clone())),
            ("energies_zero", Value::floats(self.energies_zero.clone())),
            ("scf_energies", ragged_floats(&self.scf_energies)),
            (
                "energy_components",
                Value::Ragged(
                    self.energy_components
                        .iter()
                        .map(|step| Value::float_rows(step))
                        .collect(),
                ),
            ),
            ("n_atoms", Value::Int(self.n_atoms as i64)),
            ("positions", per_atom_vectors(&self.positions)),
            ("forces", per_atom_vectors(&self.forces)),
            ("cells", Value::tensors(&self.cells)),
            ("volumes", Value::floats(self.volumes.clone())),
            ("steps", ints(self.steps.iter().copied())),
            ("time", Value::floats(self.time.clone())),
            ("temperatures", Value::floats(self.temperatures.clone())),
            ("stresses", Value::tensors(&self.stresses)),
            ("pressures", Value::floats(self.pressures.clone())),
            ("fermi_level", opt_float(self.fermi_level)),
            ("e_fermi_list", Value::floats(self.e_fermi_list.clone())),
            ("vbm_list", ragged_floats(&self.vbm_list)),
            ("cbm_list", ragged_floats(&self.cbm_list)),
            (
                "irreducible_kpoints",
                self.irreducible_kpoints
                    .as_deref()
                    .map_or(Value::Null, Value::float_rows),
            ),
            (
                "irreducible_kpoint_weights",
                self.irreducible_kpoint_weights
                    .clone()
                    .map_or(Value::Null, Value::floats),
            ),
            (
                "number_plane_waves",
                self.number_plane_waves
                    .as_ref()
                    .map_or(Value::Null, |pw| ints(pw.iter().copied())),
            ),
            (
                "magnetization",
                Value::Ragged(
                    self.magnetization
                        .iter()
                        .map(|step| Value::Ragged(step.iter().map(moment).collect()))
                        .collect(),
                ),
            ),
            (
                "final_magmoms",
                self.final_magmoms.as_ref().map_or(Value::Null, local_moments),
            ),
            (
                "scf_dipole_moments",
                Value::Ragged(
                    self.scf_dipole_moments
                        .iter()
                        .map(|step| Value::float_rows(step))
                        .collect(),
                ),
            ),
            ("kin_energy_error", Value::Float(self.kin_energy_error)),
            ("broyden_mixing", Value::Int(self.broyden_mixing as i64)),
            ("n_elect", opt_float(self.n_elect)),
            (
                "elastic_constants",
                self.elastic_constants
                    .as_ref()
                    .map_or(Value::Null, |c| Value::float_rows(c)),
            ),
            ("resources/cpu_time", opt_float(self.resources.cpu_time)),
            ("resources/user_time", opt_float(self.resources.user_time)),
            ("resources/system_time", opt_float(self.resources.system_time)),
            ("resources/elapsed_time", opt_float(self.resources.elapsed_time)),
            ("resources/memory_used", opt_float(self.resources.memory_used)),
        ]
    }

    /// 写入全部物理量
    pub fn to_store(&self, store: &mut dyn GroupStore, group: &str) -> Result<()> {
        for (name, value) in self.entries() {
            store.put(&join(group, name), value)?;
        }
        Ok(())
    }

    /// 只写入 `MINIMAL_KEYS` 中的物理量
    pub fn to_store_minimal(&self, store: &mut dyn GroupStore, group: &str) -> Result<()> {
        for (name, value) in self.entries() {
            let top = name.split('/').next().unwrap_or(name);
            if MINIMAL_KEYS.contains(&top) {
                store.put(&join(group, name), value)?;
            }
        }
        Ok(())
    }

    /// 从存档重建；缺失的节点取默认值
    pub fn from_store(store: &dyn GroupStore, group: &str) -> Result<Self> {
        let r = Reader { store, group };
        Ok(ParsedLog {
            energies: r.read("energies", read_floats)?,
            energies_int: r.read("energies_int", read_floats)?,
            energies_zero: r.read("energies_zero", read_floats)?,
            scf_energies: r.read("scf_energies", read_ragged_floats)?,
            energy_components: r.read("energy_components", read_energy_components)?,
            n_atoms: r.read("n_atoms", |v, p| to_usize(as_i64(v, p)?, p))?,
            positions: r.read("positions", read_per_atom_vectors)?,
            forces: r.read("forces", read_per_atom_vectors)?,
            cells: r.read("cells", read_tensors)?,
            volumes: r.read("volumes", read_floats)?,
            steps: r.read("steps", read_usizes)?,
            time: r.read("time", read_floats)?,
            temperatures: r.read("temperatures", read_floats)?,
            stresses: r.read("stresses", read_tensors)?,
            pressures: r.read("pressures", read_floats)?,
            fermi_level: r.read("fermi_level", read_opt_float)?,
            e_fermi_list: r.read("e_fermi_list", read_floats)?,
            vbm_list: r.read("vbm_list", read_ragged_floats)?,
            cbm_list: r.read("cbm_list", read_ragged_floats)?,
            irreducible_kpoints: r.read("irreducible_kpoints", |v, p| {
                nullable(v, |v| read_vectors(v, p))
            })?,
            irreducible_kpoint_weights: r.read("irreducible_kpoint_weights", |v, p| {
                nullable(v, |v| read_floats(v, p))
            })?,
            number_plane_waves: r.read("number_plane_waves", |v, p| {
                nullable(v, |v| read_usizes(v, p))
            })?,
            magnetization: r.read("magnetization", read_magnetization)?,
            final_magmoms: r.read("final_magmoms", |v, p| {
                nullable(v, |v| read_local_moments(v, p))
            })?,
            scf_dipole_moments: r.read("scf_dipole_moments", |v, p| {
                as_ragged(v, p)?.iter().map(|s| read_vectors(s, p)).collect()
            })?,
            kin_energy_error: r.read("kin_energy_error", as_f64)?,
            broyden_mixing: r.read("broyden_mixing", |v, p| to_usize(as_i64(v, p)?, p))?,
            n_elect: r.read("n_elect", read_opt_float)?,
            elastic_constants: r.read("elastic_constants", |v, p| {
                nullable(v, |v| read_elastic(v, p))
            })?,
            resources: Resources {
                cpu_time: r.read("resources/cpu_time", read_opt_float)?,
                user_time: r.read("resources/user_time", read_opt_float)?,
                system_time: r.read("resources/system_time", read_opt_float)?,
                elapsed_time: r.read("resources/elapsed_time", read_opt_float)?,
                memory_used: r.read("resources/memory_used", read_opt_float)?,
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────
// 读取
// ─────────────────────────────────────────────────────────────

struct Reader<'a> {
    store: &'a dyn GroupStore,
    group: &'a str,
}

impl Reader<'_> {
    fn read<T: Default>(
        &self,
        name: &str,
        f: impl FnOnce(&Value, &str) -> Result<T>,
    ) -> Result<T> {
        let path = join(self.group, name);
        match self.store.get(&path) {
            Some(value) => f(&value, &path),
            None => Ok(T::default()),
        }
    }
}

fn nullable<T>(value: &Value, f: impl FnOnce(&Value) -> Result<T>) -> Result<Option<T>> {
    if value.is_null() {
        Ok(None)
    } else {
        f(value).map(Some)
    }
}

fn to_usize(v: i64, path: &str) -> Result<usize> {
    usize::try_from(v).map_err(|_| OutcarError::StoreTypeMismatch {
        path: path.to_string(),
        expected: "non-negative integer".to_string(),
        found: v.to_string(),
    })
}

fn read_opt_float(value: &Value, path: &str) -> Result<Option<f64>> {
    nullable(value, |v| as_f64(v, path))
}

fn read_floats(value: &Value, path: &str) -> Result<Vec<f64>> {
    as_float_array(value, path, &[])
}

fn read_usizes(value: &Value, path: &str) -> Result<Vec<usize>> {
    as_int_array(value, path)?
        .into_iter()
        .map(|v| to_usize(v, path))
        .collect()
}

fn read_ragged_floats(value: &Value, path: &str) -> Result<Vec<Vec<f64>>> {
    as_ragged(value, path)?
        .iter()
        .map(|row| read_floats(row, path))
        .collect()
}

/// 定长记录数组，如 [n, 3] 或 [n, 11]
fn read_records<const N: usize>(
    value: &Value,
    path: &str,
    inner: &[usize],
) -> Result<Vec<[f64; N]>> {
    let data = as_float_array(value, path, inner)?;
    Ok(data
        .chunks_exact(N)
        .map(|c| {
            let mut record = [0.0; N];
            record.copy_from_slice(c);
            record
        })
        .collect())
}

fn read_vectors(value: &Value, path: &str) -> Result<Vec<[f64; 3]>> {
    read_records::<3>(value, path, &[3])
}

fn read_tensors(value: &Value, path: &str) -> Result<Vec<Tensor3>> {
    Ok(read_records::<9>(value, path, &[3, 3])?
        .into_iter()
        .map(|c| [[c[0], c[1], c[2]], [c[3], c[4], c[5]], [c[6], c[7], c[8]]])
        .collect())
}

fn read_energy_components(value: &Value, path: &str) -> Result<Vec<Vec<EnergyComponents>>> {
    as_ragged(value, path)?
        .iter()
        .map(|step| read_records::<N_ENERGY_COMPONENTS>(step, path, &[N_ENERGY_COMPONENTS]))
        .collect()
}

fn read_per_atom_vectors(value: &Value, path: &str) -> Result<Vec<Vec<[f64; 3]>>> {
    match value {
        Value::FloatArray { shape, data }
            if shape.len() == 3
                && shape[2] == 3
                && shape.iter().product::<usize>() == data.len() =>
        {
            let atoms = shape[1];
            if atoms == 0 {
                return Ok(vec![Vec::new(); shape[0]]);
            }
            Ok(data
                .chunks_exact(atoms * 3)
                .map(|step| step.chunks_exact(3).map(|v| [v[0], v[1], v[2]]).collect())
                .collect())
        }
        _ => Err(mismatch(path, "float array of shape [steps, atoms, 3]", value)),
    }
}

fn read_magnetization(value: &Value, path: &str) -> Result<Vec<Vec<Moment>>> {
    as_ragged(value, path)?
        .iter()
        .map(|step| {
            as_ragged(step, path)?
                .iter()
                .map(|m| match m {
                    Value::FloatArray { data, .. } if data.len() == 3 => {
                        Ok(Moment::NonCollinear([data[0], data[1], data[2]]))
                    }
                    other => as_f64(other, path).map(Moment::Collinear),
                })
                .collect()
        })
        .collect()
}

fn read_local_moments(value: &Value, path: &str) -> Result<LocalMoments> {
    let steps = as_ragged(value, path)?;
    let non_collinear = steps
        .iter()
        .any(|s| matches!(s, Value::FloatArray { shape, .. } if shape.len() == 2));
    if non_collinear {
        Ok(LocalMoments::NonCollinear(
            steps
                .iter()
                .map(|s| read_vectors(s, path))
                .collect::<Result<_>>()?,
        ))
    } else {
        Ok(LocalMoments::Collinear(
            steps
                .iter()
                .map(|s| read_floats(s, path))
                .collect::<Result<_>>()?,
        ))
    }
}

fn read_elastic(value: &Value, path: &str) -> Result<[[f64; 6]; 6]> {
    let rows = read_records::<6>(value, path, &[6])?;
    rows.try_into()
        .map_err(|_| mismatch(path, "6x6 float array", value))
}
