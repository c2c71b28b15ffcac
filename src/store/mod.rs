//! # 分层存档
//!
//! 以 `/` 分隔路径组织的分组存储接口 `GroupStore`，以及它的内存实现
//! `MemoryStore`（可整体保存为 JSON 文件）。
//!
//! 节点值统一用 `Value` 表示。JSON 没有非有限浮点数：NaN 写作 `null`，
//! 正负无穷写作字符串 `"inf"` / `"-inf"`，读回时全部还原。
//!
//! ## 依赖关系
//! - 被 `store/outcar.rs`, `settings.rs`, `commands/parse.rs` 使用
//! - 使用 `serde`, `serde_json`

pub mod outcar;

use crate::error::{OutcarError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// 存档节点值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Float(#[serde(with = "json_float")] f64),
    FloatArray {
        shape: Vec<usize>,
        #[serde(with = "json_float::seq")]
        data: Vec<f64>,
    },
    IntArray {
        shape: Vec<usize>,
        data: Vec<i64>,
    },
    /// 不规则嵌套（每个离子步长度不同的序列）
    Ragged(Vec<Value>),
    Str(String),
    StrList(Vec<String>),
    Null,
}

impl Value {
    /// 一维浮点数组
    pub fn floats(data: Vec<f64>) -> Self {
        Value::FloatArray {
            shape: vec![data.len()],
            data,
        }
    }

    /// 每行长度相同的二维浮点数组
    pub fn float_rows<const N: usize>(rows: &[[f64; N]]) -> Self {
        Value::FloatArray {
            shape: vec![rows.len(), N],
            data: rows.iter().flatten().copied().collect(),
        }
    }

    /// 3×3 张量序列
    pub fn tensors(tensors: &[[[f64; 3]; 3]]) -> Self {
        Value::FloatArray {
            shape: vec![tensors.len(), 3, 3],
            data: tensors.iter().flatten().flatten().copied().collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::FloatArray { .. } => "float array",
            Value::IntArray { .. } => "int array",
            Value::Ragged(_) => "ragged list",
            Value::Str(_) => "string",
            Value::StrList(_) => "string list",
            Value::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// 分组存储接口
pub trait GroupStore {
    /// 写入节点，覆盖已有值
    fn put(&mut self, path: &str, value: Value) -> Result<()>;

    /// 读取节点
    fn get(&self, path: &str) -> Option<Value>;

    /// 组内的直接子节点名
    fn list_nodes(&self, group: &str) -> Vec<String>;

    /// 组内的直接子组名
    fn list_groups(&self, group: &str) -> Vec<String>;

    fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

/// 规范化路径：去掉首尾和重复的 `/`
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// 拼接组名与节点名
pub fn join(group: &str, name: &str) -> String {
    normalize(&format!("{}/{}", group, name))
}

/// 读取必需节点
pub fn require(store: &dyn GroupStore, path: &str) -> Result<Value> {
    store.get(path).ok_or_else(|| OutcarError::MissingNode {
        path: normalize(path),
    })
}

/// 节点类型不符
pub(crate) fn mismatch(path: &str, expected: &str, found: &Value) -> OutcarError {
    OutcarError::StoreTypeMismatch {
        path: normalize(path),
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}

pub fn as_f64(value: &Value, path: &str) -> Result<f64> {
    match value {
        Value::Float(v) => Ok(*v),
        Value::Int(v) => Ok(*v as f64),
        _ => Err(mismatch(path, "float", value)),
    }
}

pub fn as_i64(value: &Value, path: &str) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        _ => Err(mismatch(path, "int", value)),
    }
}

pub fn as_str(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(mismatch(path, "string", value)),
    }
}

pub fn as_str_list(value: &Value, path: &str) -> Result<Vec<String>> {
    match value {
        Value::StrList(s) => Ok(s.clone()),
        _ => Err(mismatch(path, "string list", value)),
    }
}

/// 取出浮点数组，并检查除第一维外的形状
pub fn as_float_array(value: &Value, path: &str, inner: &[usize]) -> Result<Vec<f64>> {
    match value {
        Value::FloatArray { shape, data } => {
            let expected = format!("float array with inner shape {:?}", inner);
            if shape.is_empty() || &shape[1..] != inner {
                return Err(mismatch(path, &expected, value));
            }
            if shape.iter().product::<usize>() != data.len() {
                return Err(mismatch(path, &expected, value));
            }
            Ok(data.clone())
        }
        _ => Err(mismatch(path, "float array", value)),
    }
}

pub fn as_int_array(value: &Value, path: &str) -> Result<Vec<i64>> {
    match value {
        Value::IntArray { data, .. } => Ok(data.clone()),
        _ => Err(mismatch(path, "int array", value)),
    }
}

pub fn as_ragged<'a>(value: &'a Value, path: &str) -> Result<&'a [Value]> {
    match value {
        Value::Ragged(items) => Ok(items),
        _ => Err(mismatch(path, "ragged list", value)),
    }
}

/// 内存中的分组存储
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    nodes: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 保存为 JSON 文件
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| OutcarError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// 从 JSON 文件读取
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OutcarError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| OutcarError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 组内路径的相对部分，组本身不算
    fn children<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = match normalize(group) {
            g if g.is_empty() => String::new(),
            g => format!("{}/", g),
        };
        self.nodes
            .keys()
            .filter_map(move |k| k.strip_prefix(prefix.as_str()))
    }
}

impl GroupStore for MemoryStore {
    fn put(&mut self, path: &str, value: Value) -> Result<()> {
        let key = normalize(path);
        if key.is_empty() {
            return Err(OutcarError::InvalidArgument(format!(
                "empty store path: '{}'",
                path
            )));
        }
        self.nodes.insert(key, value);
        Ok(())
    }

    fn get(&self, path: &str) -> Option<Value> {
        self.nodes.get(&normalize(path)).cloned()
    }

    fn list_nodes(&self, group: &str) -> Vec<String> {
        self.children(group)
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }

    fn list_groups(&self, group: &str) -> Vec<String> {
        let mut groups: Vec<String> = self
            .children(group)
            .filter_map(|rest| rest.split_once('/').map(|(head, _)| head.to_string()))
            .collect();
        groups.dedup();
        groups
    }
}

/// 非有限浮点数的 JSON 表示
mod json_float {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const POS_INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Marker(String),
    }

    fn encode(v: f64) -> Option<Repr> {
        if v.is_nan() {
            None
        } else if v == f64::INFINITY {
            Some(Repr::Marker(POS_INF.to_string()))
        } else if v == f64::NEG_INFINITY {
            Some(Repr::Marker(NEG_INF.to_string()))
        } else {
            Some(Repr::Number(v))
        }
    }

    fn decode(repr: Option<Repr>) -> Result<f64, String> {
        match repr {
            None => Ok(f64::NAN),
            Some(Repr::Number(v)) => Ok(v),
            Some(Repr::Marker(m)) if m == POS_INF => Ok(f64::INFINITY),
            Some(Repr::Marker(m)) if m == NEG_INF => Ok(f64::NEG_INFINITY),
            Some(Repr::Marker(m)) => Err(format!("unexpected float marker '{}'", m)),
        }
    }

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        encode(*v).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        decode(Option::<Repr>::deserialize(d)?).map_err(D::Error::custom)
    }

    pub mod seq {
        use super::{decode, encode, Repr};
        use serde::de::Error;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
            v.iter()
                .map(|x| encode(*x))
                .collect::<Vec<_>>()
                .serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
            Vec::<Option<Repr>>::deserialize(d)?
                .into_iter()
                .map(|x| decode(x).map_err(D::Error::custom))
                .collect()
        }
    }
}
