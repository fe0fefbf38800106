//! Raw manifest types matching the JSON schema manifest (one entry per config type).

use serde::{Deserialize, Serialize};

/// Source text format of a config resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
}

impl SourceFormat {
    /// Guess from the resource key's extension; anything but `.json` is CSV.
    pub fn from_resource(resource: &str) -> Self {
        if resource.to_lowercase().ends_with(".json") {
            SourceFormat::Json
        } else {
            SourceFormat::Csv
        }
    }
}

/// Backing store shape of a config type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Many entities, one per source row.
    #[default]
    Table,
    /// One entity, from `Key,Value` rows or one JSON object.
    Singleton,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Table => "table",
            Shape::Singleton => "singleton",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Type name, e.g. `int`, `string[]`, `<int,string>`, `(int,int)[]`.
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub rule: Option<ValidationRule>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    /// Opaque key handed to the reader.
    pub resource: String,
    /// Defaults from the resource extension.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default)]
    pub shape: Shape,
    /// Key column, or columns for a composite key, of a table store.
    #[serde(default)]
    pub key: Option<KeyColumns>,
    pub fields: Vec<FieldConfig>,
    /// Column ranges decoded as lists of records.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// `"key": "ID"` or `"key": ["Kind", "Level"]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyColumns {
    One(String),
    Many(Vec<String>),
}

impl KeyColumns {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            KeyColumns::One(k) => vec![k.clone()],
            KeyColumns::Many(ks) => ks.clone(),
        }
    }
}

/// A run of columns read `fields.len()` at a time, each step one record.
/// `start` and `end` are 1-based and inclusive; no `end` runs to the last column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub start: usize,
    #[serde(default)]
    pub end: Option<usize>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// All config types in declared load order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub types: Vec<TypeConfig>,
}
