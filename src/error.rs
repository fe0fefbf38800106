//! Typed errors: reader, decode/coercion, per-type load and registry access.

use std::fmt;
use thiserror::Error;

/// Schema manifest problems, caught before any resource is read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("duplicate config type: {0}")]
    DuplicateType(String),
    #[error("duplicate field '{field}' in type {type_name}")]
    DuplicateField { type_name: String, field: String },
    #[error("invalid key field: type {type_name} field {field}")]
    InvalidKey { type_name: String, field: String },
    #[error("invalid field type '{type_name}': {reason}")]
    InvalidFieldType { type_name: String, reason: String },
    #[error("manifest: {0}")]
    Manifest(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("io: {0}")]
    Io(String),
    #[error("bundle: {0}")]
    Bundle(String),
}

/// Where in a resource a row-level error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRef {
    /// 1-based physical line of a CSV record.
    Line(u64),
    /// 0-based element index of a JSON array.
    Index(usize),
    /// Key column of a key/value singleton row.
    Key(String),
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRef::Line(n) => write!(f, "line {}", n),
            RowRef::Index(i) => write!(f, "element {}", i),
            RowRef::Key(k) => write!(f, "key '{}'", k),
        }
    }
}

fn located(at: &Option<RowRef>) -> String {
    at.as_ref().map(|r| format!(" at {}", r)).unwrap_or_default()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(#[from] ReadError),
    #[error("malformed table{}: {reason}", located(.at))]
    MalformedTable { at: Option<RowRef>, reason: String },
    #[error("malformed json{}: {reason}", located(.at))]
    MalformedJson { at: Option<RowRef>, reason: String },
    #[error("missing field '{field}'{}", located(.at))]
    MissingField { field: String, at: Option<RowRef> },
    #[error("type mismatch for '{field}'{}: '{raw}' is not a valid {expected}", located(.at))]
    TypeMismatch {
        field: String,
        raw: String,
        expected: String,
        at: Option<RowRef>,
    },
    #[error("constraint on '{field}'{}: {reason}", located(.at))]
    Constraint {
        field: String,
        reason: String,
        at: Option<RowRef>,
    },
    #[error("duplicate key '{key}'{}", located(.at))]
    DuplicateKey { key: String, at: Option<RowRef> },
}

impl LoadError {
    /// Attach a row location unless one is already set.
    pub fn at(mut self, row: RowRef) -> Self {
        match &mut self {
            LoadError::MalformedTable { at, .. }
            | LoadError::MalformedJson { at, .. }
            | LoadError::MissingField { at, .. }
            | LoadError::TypeMismatch { at, .. }
            | LoadError::Constraint { at, .. }
            | LoadError::DuplicateKey { at, .. } => {
                if at.is_none() {
                    *at = Some(row);
                }
            }
            LoadError::ResourceUnavailable(_) => {}
        }
        self
    }

    pub fn row(&self) -> Option<&RowRef> {
        match self {
            LoadError::MalformedTable { at, .. }
            | LoadError::MalformedJson { at, .. }
            | LoadError::MissingField { at, .. }
            | LoadError::TypeMismatch { at, .. }
            | LoadError::Constraint { at, .. }
            | LoadError::DuplicateKey { at, .. } => at.as_ref(),
            LoadError::ResourceUnavailable(_) => None,
        }
    }

    /// Qualify the field name with its column group, as `Group.Field`.
    pub(crate) fn in_group(mut self, group: &str) -> Self {
        match &mut self {
            LoadError::MissingField { field, .. }
            | LoadError::TypeMismatch { field, .. }
            | LoadError::Constraint { field, .. } => *field = format!("{}.{}", group, field),
            _ => {}
        }
        self
    }

    pub(crate) fn missing(field: &str) -> Self {
        LoadError::MissingField {
            field: field.to_string(),
            at: None,
        }
    }

    pub(crate) fn mismatch(field: &str, raw: impl Into<String>, expected: impl fmt::Display) -> Self {
        LoadError::TypeMismatch {
            field: field.to_string(),
            raw: raw.into(),
            expected: expected.to_string(),
            at: None,
        }
    }

    pub(crate) fn constraint(field: &str, reason: impl Into<String>) -> Self {
        LoadError::Constraint {
            field: field.to_string(),
            reason: reason.into(),
            at: None,
        }
    }
}

/// A load failure for one config type, with the resource it came from.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("load {type_name} from '{resource}': {error}")]
pub struct TypeLoadError {
    pub type_name: String,
    pub resource: String,
    #[source]
    pub error: LoadError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] TypeLoadError),
    #[error("{} config types failed to load: {}", .0.len(), summarize(.0))]
    Aggregate(Vec<TypeLoadError>),
    #[error("unknown config type: {0}")]
    UnknownType(String),
    #[error("config type {0} is not loaded")]
    NotLoaded(String),
    #[error("config type {type_name} has {expected} key fields, got {found} key values")]
    KeyArity {
        type_name: String,
        expected: usize,
        found: usize,
    },
    #[error("config type {type_name} is not a {expected}")]
    ShapeMismatch { type_name: String, expected: &'static str },
    #[error("deserialize {type_name}: {reason}")]
    Deserialize { type_name: String, reason: String },
}

fn summarize(errors: &[TypeLoadError]) -> String {
    errors
        .iter()
        .map(|e| e.type_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl RegistryError {
    /// Per-type load failures carried by this error, if any.
    pub fn load_errors(&self) -> &[TypeLoadError] {
        match self {
            RegistryError::Load(e) => std::slice::from_ref(e),
            RegistryError::Aggregate(v) => v,
            _ => &[],
        }
    }
}
