//! # 解析设置
//!
//! `ParseSettings` 控制应力单位、k 点输出形式和存档组名。
//!
//! 存档格式带版本号：写入总是 `"0.2.0"`（结构化节点）；读取时
//! 没有 `HDF_VERSION` 节点视为 `"0.1.0"`（扁平的参数/值字符串表），
//! 其他版本号直接报错。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/`, `commands/parse.rs` 使用
//! - 使用 `store/`

use crate::error::{OutcarError, Result};
use crate::store::{self, GroupStore, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 当前写入的存档版本
pub const SETTINGS_VERSION: &str = "0.2.0";

/// 无版本号时假定的旧版本
pub const LEGACY_SETTINGS_VERSION: &str = "0.1.0";

/// 应力读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StressUnit {
    /// 读 `in kB` 行，换算为 eV/Å³
    #[default]
    KBar,
    /// 读 `Total` 行 (eV)，不换算
    Ev,
}

impl fmt::Display for StressUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StressUnit::KBar => write!(f, "kbar"),
            StressUnit::Ev => write!(f, "ev"),
        }
    }
}

impl FromStr for StressUnit {
    type Err = OutcarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "kbar" | "kb" => Ok(StressUnit::KBar),
            "ev" => Ok(StressUnit::Ev),
            _ => Err(OutcarError::InvalidArgument(format!(
                "Unknown stress unit: {} (expected kbar or ev)",
                s
            ))),
        }
    }
}

/// 不可约 k 点的输出选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpointOptions {
    /// true 取倒空间分数坐标，false 取笛卡尔坐标
    pub reciprocal: bool,
    pub weights: bool,
    pub plane_waves: bool,
}

impl Default for KpointOptions {
    fn default() -> Self {
        Self {
            reciprocal: true,
            weights: true,
            plane_waves: true,
        }
    }
}

/// 解析设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSettings {
    pub stress_unit: StressUnit,
    pub kpoints: KpointOptions,
    /// 结果写入存档时使用的组名
    pub group: String,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            stress_unit: StressUnit::default(),
            kpoints: KpointOptions::default(),
            group: "outcar".to_string(),
        }
    }
}

impl ParseSettings {
    /// 以当前版本写入 `group` 下
    pub fn to_store(&self, store: &mut dyn GroupStore, group: &str) -> Result<()> {
        let node = |name: &str| store::join(group, name);
        store.put(&node("HDF_VERSION"), Value::Str(SETTINGS_VERSION.to_string()))?;
        store.put(
            &node("input/stress_unit"),
            Value::Str(self.stress_unit.to_string()),
        )?;
        store.put(
            &node("input/kpoints/reciprocal"),
            Value::Int(self.kpoints.reciprocal as i64),
        )?;
        store.put(
            &node("input/kpoints/weights"),
            Value::Int(self.kpoints.weights as i64),
        )?;
        store.put(
            &node("input/kpoints/plane_waves"),
            Value::Int(self.kpoints.plane_waves as i64),
        )?;
        store.put(&node("input/group"), Value::Str(self.group.clone()))?;
        Ok(())
    }

    /// 按版本号分派读取
    pub fn from_store(store: &dyn GroupStore, group: &str) -> Result<Self> {
        let version_path = store::join(group, "HDF_VERSION");
        let version = match store.get(&version_path) {
            Some(v) => store::as_str(&v, &version_path)?,
            None => LEGACY_SETTINGS_VERSION.to_string(),
        };
        tracing::debug!(version = %version, group, "reading parse settings");

        match version.as_str() {
            LEGACY_SETTINGS_VERSION => Self::from_parameter_table(store, group),
            SETTINGS_VERSION => Self::from_structured(store, group),
            _ => Err(OutcarError::UnsupportedVersion(version)),
        }
    }

    fn from_structured(store: &dyn GroupStore, group: &str) -> Result<Self> {
        let read_str = |name: &str| -> Result<String> {
            let path = store::join(group, name);
            store::as_str(&store::require(store, &path)?, &path)
        };
        let read_flag = |name: &str| -> Result<bool> {
            let path = store::join(group, name);
            Ok(store::as_i64(&store::require(store, &path)?, &path)? != 0)
        };

        Ok(Self {
            stress_unit: read_str("input/stress_unit")?.parse()?,
            kpoints: KpointOptions {
                reciprocal: read_flag("input/kpoints/reciprocal")?,
                weights: read_flag("input/kpoints/weights")?,
                plane_waves: read_flag("input/kpoints/plane_waves")?,
            },
            group: read_str("input/group")?,
        })
    }

    /// 旧格式：两列等长字符串表，缺失的键取默认值
    fn from_parameter_table(store: &dyn GroupStore, group: &str) -> Result<Self> {
        let keys_path = store::join(group, "input/custom_dict/Parameter");
        let values_path = store::join(group, "input/custom_dict/Value");
        let keys = store::as_str_list(&store::require(store, &keys_path)?, &keys_path)?;
        let values = store::as_str_list(&store::require(store, &values_path)?, &values_path)?;
        if keys.len() != values.len() {
            return Err(OutcarError::StoreTypeMismatch {
                path: values_path,
                expected: format!("{} values", keys.len()),
                found: format!("{} values", values.len()),
            });
        }

        let mut settings = Self::default();
        for (key, value) in keys.iter().zip(values.iter()) {
            match key.as_str() {
                "stress_unit" => settings.stress_unit = value.parse()?,
                "kpoints_reciprocal" => settings.kpoints.reciprocal = parse_flag(key, value)?,
                "kpoints_weights" => settings.kpoints.weights = parse_flag(key, value)?,
                "kpoints_plane_waves" => settings.kpoints.plane_waves = parse_flag(key, value)?,
                "group" => settings.group = value.clone(),
                _ => tracing::warn!(key = %key, "ignoring unknown legacy setting"),
            }
        }
        Ok(settings)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(OutcarError::InvalidArgument(format!(
            "Setting '{}' expects a boolean, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_current_version_round_trip() {
        let settings = ParseSettings {
            stress_unit: StressUnit::Ev,
            kpoints: KpointOptions {
                reciprocal: false,
                weights: true,
                plane_waves: false,
            },
            group: "relax".to_string(),
        };
        let mut store = MemoryStore::new();
        settings.to_store(&mut store, "job").unwrap();

        assert_eq!(
            store.get("job/HDF_VERSION"),
            Some(Value::Str("0.2.0".to_string()))
        );
        assert_eq!(ParseSettings::from_store(&store, "job").unwrap(), settings);
    }

    #[test]
    fn test_legacy_table_without_version() {
        let mut store = MemoryStore::new();
        store
            .put(
                "job/input/custom_dict/Parameter",
                Value::StrList(vec!["stress_unit".into(), "kpoints_reciprocal".into()]),
            )
            .unwrap();
        store
            .put(
                "job/input/custom_dict/Value",
                Value::StrList(vec!["ev".into(), "False".into()]),
            )
            .unwrap();

        let settings = ParseSettings::from_store(&store, "job").unwrap();
        assert_eq!(settings.stress_unit, StressUnit::Ev);
        assert!(!settings.kpoints.reciprocal);
        assert!(settings.kpoints.weights);
        assert_eq!(settings.group, "outcar");
    }

    #[test]
    fn test_explicit_legacy_version() {
        let mut store = MemoryStore::new();
        store.put("HDF_VERSION", Value::Str("0.1.0".into())).unwrap();
        store
            .put("input/custom_dict/Parameter", Value::StrList(vec![]))
            .unwrap();
        store.put("input/custom_dict/Value", Value::StrList(vec![])).unwrap();

        assert_eq!(
            ParseSettings::from_store(&store, "").unwrap(),
            ParseSettings::default()
        );
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let mut store = MemoryStore::new();
        store.put("job/HDF_VERSION", Value::Str("0.3.0".into())).unwrap();

        match ParseSettings::from_store(&store, "job") {
            Err(OutcarError::UnsupportedVersion(v)) => assert_eq!(v, "0.3.0"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_legacy_table_length_mismatch() {
        let mut store = MemoryStore::new();
        store
            .put(
                "input/custom_dict/Parameter",
                Value::StrList(vec!["group".into()]),
            )
            .unwrap();
        store.put("input/custom_dict/Value", Value::StrList(vec![])).unwrap();
        assert!(ParseSettings::from_store(&store, "").is_err());
    }

    #[test]
    fn test_stress_unit_from_str() {
        assert_eq!("kB".parse::<StressUnit>().unwrap(), StressUnit::KBar);
        assert_eq!("EV".parse::<StressUnit>().unwrap(), StressUnit::Ev);
        assert!("GPa".parse::<StressUnit>().is_err());
    }
}
