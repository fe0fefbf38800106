//! Field kinds and the type-name grammar used by schema manifests.
//!
//! `int`, `float32`, `string[]`, `<int,string>`, `(int,uint16)[]`.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    DateTime,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int8 => "int8",
            ScalarKind::Int16 => "int16",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt8 => "uint8",
            ScalarKind::UInt16 => "uint16",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
            ScalarKind::String => "string",
            ScalarKind::DateTime => "datetime",
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 | ScalarKind::Int64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, ScalarKind::UInt8 | ScalarKind::UInt16 | ScalarKind::UInt32 | ScalarKind::UInt64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_signed() || self.is_unsigned() || self.is_float()
    }

    /// Inclusive range for signed integer kinds.
    pub(crate) fn signed_range(self) -> (i64, i64) {
        match self {
            ScalarKind::Int8 => (i8::MIN as i64, i8::MAX as i64),
            ScalarKind::Int16 => (i16::MIN as i64, i16::MAX as i64),
            ScalarKind::Int32 => (i32::MIN as i64, i32::MAX as i64),
            _ => (i64::MIN, i64::MAX),
        }
    }

    /// Inclusive upper bound for unsigned integer kinds.
    pub(crate) fn unsigned_max(self) -> u64 {
        match self {
            ScalarKind::UInt8 => u8::MAX as u64,
            ScalarKind::UInt16 => u16::MAX as u64,
            ScalarKind::UInt32 => u32::MAX as u64,
            _ => u64::MAX,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => ScalarKind::Bool,
            "int8" => ScalarKind::Int8,
            "int16" => ScalarKind::Int16,
            "int32" => ScalarKind::Int32,
            "int" | "int64" | "long" => ScalarKind::Int64,
            "uint8" | "byte" => ScalarKind::UInt8,
            "uint16" => ScalarKind::UInt16,
            "uint32" => ScalarKind::UInt32,
            "uint" | "uint64" => ScalarKind::UInt64,
            "float32" => ScalarKind::Float32,
            "float" | "float64" | "double" => ScalarKind::Float64,
            "string" | "str" => ScalarKind::String,
            "datetime" => ScalarKind::DateTime,
            other => {
                return Err(ConfigError::InvalidFieldType {
                    type_name: other.to_string(),
                    reason: "unknown scalar type".into(),
                })
            }
        })
    }
}

/// Shape of a field's value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// `T[]`: items separated by the item delimiter.
    Array(ScalarKind),
    /// `(A,B,...)[]`: fixed-arity tuples separated by the item delimiter,
    /// positions by the pair delimiter.
    TupleList(Vec<ScalarKind>),
    /// `<K,V>`: key/value pairs, keys unique.
    Map(ScalarKind, ScalarKind),
}

impl FieldKind {
    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldKind::Scalar(_))
    }

    pub fn is_composite(&self) -> bool {
        !self.is_scalar()
    }

    /// Kinds whose text is kept verbatim, so whitespace is content.
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Scalar(ScalarKind::String) | FieldKind::Array(ScalarKind::String))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(k) => write!(f, "{}", k),
            FieldKind::Array(k) => write!(f, "{}[]", k),
            FieldKind::TupleList(ks) => {
                let names: Vec<_> = ks.iter().map(|k| k.name()).collect();
                write!(f, "({})[]", names.join(","))
            }
            FieldKind::Map(k, v) => write!(f, "<{},{}>", k, v),
        }
    }
}

impl FromStr for FieldKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| ConfigError::InvalidFieldType {
            type_name: s.to_string(),
            reason: reason.to_string(),
        };
        if let Some(inner) = s.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
            let parts: Vec<&str> = inner.split(',').collect();
            if parts.len() != 2 {
                return Err(invalid("map needs exactly a key and a value type"));
            }
            let key: ScalarKind = parts[0].parse()?;
            let value: ScalarKind = parts[1].parse()?;
            if key.is_float() {
                return Err(invalid("map keys cannot be floating-point"));
            }
            return Ok(FieldKind::Map(key, value));
        }
        if let Some(elem) = s.strip_suffix("[]") {
            let elem = elem.trim();
            if let Some(inner) = elem.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
                let kinds = inner
                    .split(',')
                    .map(str::parse::<ScalarKind>)
                    .collect::<Result<Vec<_>, _>>()?;
                if kinds.len() < 2 {
                    return Err(invalid("tuple lists need at least two positions"));
                }
                return Ok(FieldKind::TupleList(kinds));
            }
            return Ok(FieldKind::Array(elem.parse()?));
        }
        Ok(FieldKind::Scalar(s.parse()?))
    }
}
