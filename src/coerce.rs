//! Field coercion: raw CSV cells and JSON values to typed `Value`s per field descriptor.
//!
//! Both sources go through the same rules so that equal logical input yields
//! equal entities. JSON scalars are validated against the field kind rather
//! than re-parsed; JSON strings fall back to the text rules.

use crate::config::{FieldDescriptor, FieldGroup, FieldKind, FieldRule, ScalarKind, Schema};
use crate::error::LoadError;
use crate::settings::Delimiters;
use crate::value::{Entity, Value, DATETIME_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

/// Strings that coerce to `true` (case-insensitive). Everything else is `false`.
const TRUTHY: &[&str] = &["1", "on", "yes", "true"];

const DATETIME_FORMATS: &[&str] = &[DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S"];

/// A field's raw input before coercion.
#[derive(Clone, Copy, Debug)]
pub enum Raw<'a> {
    Absent,
    Text(&'a str),
    Json(&'a JsonValue),
}

impl<'a> Raw<'a> {
    pub fn from_json(v: Option<&'a JsonValue>) -> Self {
        match v {
            None | Some(JsonValue::Null) => Raw::Absent,
            Some(v) => Raw::Json(v),
        }
    }

    /// Absent, or blank for the kind: empty for verbatim text, whitespace-only otherwise.
    fn is_missing(&self, kind: &FieldKind) -> bool {
        let blank = |s: &str| if kind.is_textual() { s.is_empty() } else { s.trim().is_empty() };
        match *self {
            Raw::Absent => true,
            Raw::Text(s) => blank(s),
            Raw::Json(JsonValue::String(s)) => blank(s.as_str()),
            Raw::Json(JsonValue::Array(a)) => a.is_empty(),
            Raw::Json(JsonValue::Object(o)) => o.is_empty(),
            Raw::Json(_) => false,
        }
    }
}

/// Total boolean rule: `1`, `on`, `yes`, `true` in any case are true.
pub fn parse_bool(text: &str) -> bool {
    let text = text.trim();
    TRUTHY.iter().any(|t| text.eq_ignore_ascii_case(t))
}

/// Default value of a kind when an optional field is absent.
pub fn zero_value(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Scalar(k) => match k {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::DateTime => Value::DateTime(NaiveDateTime::default()),
            k if k.is_signed() => Value::Int(0),
            k if k.is_unsigned() => Value::UInt(0),
            _ => Value::Float(0.0),
        },
        FieldKind::Array(_) | FieldKind::TupleList(_) => Value::List(Vec::new()),
        FieldKind::Map(_, _) => Value::Map(Vec::new()),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Coercer {
    delimiters: Delimiters,
}

impl Coercer {
    pub fn new(delimiters: Delimiters) -> Self {
        Coercer { delimiters }
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    /// Build one entity, asking `lookup` for each schema field's raw input.
    pub fn entity<'a, F>(&self, schema: &Schema, mut lookup: F) -> Result<Entity, LoadError>
    where
        F: FnMut(&str) -> Raw<'a>,
    {
        let mut fields = Vec::with_capacity(schema.len());
        for field in &schema.fields {
            let value = self.field(field, lookup(&field.name))?;
            fields.push((field.name.clone(), value));
        }
        Ok(Entity::from_fields(fields))
    }

    pub fn field(&self, field: &FieldDescriptor, raw: Raw<'_>) -> Result<Value, LoadError> {
        if raw.is_missing(&field.kind) {
            if field.required {
                return Err(LoadError::missing(&field.name));
            }
            return Ok(zero_value(&field.kind));
        }
        let value = self.coerce(&field.name, &field.kind, raw)?;
        if let Some(rule) = &field.rule {
            check_rule(&field.name, &value, rule)?;
        }
        Ok(value)
    }

    pub fn coerce(&self, name: &str, kind: &FieldKind, raw: Raw<'_>) -> Result<Value, LoadError> {
        match raw {
            Raw::Absent => Ok(zero_value(kind)),
            Raw::Text(text) => self.coerce_text(name, kind, text),
            Raw::Json(JsonValue::String(text)) => self.coerce_text(name, kind, text),
            Raw::Json(json) => self.coerce_json(name, kind, json),
        }
    }

    pub fn coerce_text(&self, name: &str, kind: &FieldKind, text: &str) -> Result<Value, LoadError> {
        let Delimiters { item, pair } = self.delimiters;
        match kind {
            FieldKind::Scalar(k) => scalar_text(name, *k, text),
            FieldKind::Array(k) => items(text, item, *k == ScalarKind::String)
                .map(|s| scalar_text(name, *k, s))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            FieldKind::TupleList(kinds) => items(text, item, false)
                .map(|s| {
                    let parts: Vec<&str> = s.split(pair).collect();
                    if parts.len() != kinds.len() {
                        return Err(LoadError::mismatch(name, s, kind));
                    }
                    parts
                        .iter()
                        .zip(kinds)
                        .map(|(p, k)| scalar_text(name, *k, p))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Tuple)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            FieldKind::Map(k, v) => {
                let mut pairs = Vec::new();
                for entry in items(text, item, false) {
                    let (key, value) = entry
                        .split_once(pair)
                        .ok_or_else(|| LoadError::mismatch(name, entry, kind))?;
                    push_unique(name, &mut pairs, scalar_text(name, *k, key)?, scalar_text(name, *v, value)?)?;
                }
                Ok(Value::Map(pairs))
            }
        }
    }

    fn coerce_json(&self, name: &str, kind: &FieldKind, json: &JsonValue) -> Result<Value, LoadError> {
        match (kind, json) {
            (FieldKind::Scalar(k), _) => scalar_json(name, *k, json),
            (FieldKind::Array(k), JsonValue::Array(elems)) => elems
                .iter()
                .map(|e| scalar_json(name, *k, e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (FieldKind::TupleList(kinds), JsonValue::Array(elems)) => elems
                .iter()
                .map(|e| match e {
                    JsonValue::Array(parts) if parts.len() == kinds.len() => parts
                        .iter()
                        .zip(kinds)
                        .map(|(p, k)| scalar_json(name, *k, p))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Tuple),
                    JsonValue::String(s) => match self.coerce_text(name, kind, s)? {
                        Value::List(mut one) if one.len() == 1 => Ok(one.remove(0)),
                        _ => Err(LoadError::mismatch(name, s.as_str(), kind)),
                    },
                    other => Err(LoadError::mismatch(name, other.to_string(), kind)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (FieldKind::Map(k, v), JsonValue::Object(obj)) => {
                let mut pairs = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    push_unique(name, &mut pairs, scalar_text(name, *k, key)?, scalar_json(name, *v, value)?)?;
                }
                Ok(Value::Map(pairs))
            }
            (FieldKind::Map(k, v), JsonValue::Array(elems)) => {
                let mut pairs = Vec::with_capacity(elems.len());
                for e in elems {
                    match e.as_array().map(Vec::as_slice) {
                        Some([key, value]) => {
                            push_unique(name, &mut pairs, scalar_json(name, *k, key)?, scalar_json(name, *v, value)?)?
                        }
                        _ => return Err(LoadError::mismatch(name, e.to_string(), kind)),
                    }
                }
                Ok(Value::Map(pairs))
            }
            _ => Err(LoadError::mismatch(name, json.to_string(), kind)),
        }
    }

    /// Records of a column group from its cells, `group.step()` cells per record.
    /// Runs of blank cells are skipped like blank rows.
    pub fn group_text(&self, group: &FieldGroup, cells: &[&str]) -> Result<Value, LoadError> {
        let mut records = Vec::new();
        for chunk in cells.chunks(group.step()) {
            if chunk.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let fields = group
                .fields
                .iter()
                .zip(chunk)
                .map(|(f, cell)| Ok((f.name.clone(), self.field(f, Raw::Text(*cell))?)))
                .collect::<Result<Vec<_>, LoadError>>()
                .map_err(|e| e.in_group(&group.name))?;
            records.push(Value::Record(Entity::from_fields(fields)));
        }
        Ok(Value::List(records))
    }

    /// Records of a column group from a JSON array of objects. Empty objects are skipped.
    pub fn group_json(&self, group: &FieldGroup, raw: Option<&JsonValue>) -> Result<Value, LoadError> {
        let elems = match raw {
            None | Some(JsonValue::Null) => return Ok(Value::List(Vec::new())),
            Some(JsonValue::Array(elems)) => elems,
            Some(other) => return Err(LoadError::mismatch(&group.name, other.to_string(), "array of records")),
        };
        let mut records = Vec::with_capacity(elems.len());
        for elem in elems {
            let obj = elem
                .as_object()
                .ok_or_else(|| LoadError::mismatch(&group.name, elem.to_string(), "record"))?;
            if obj.is_empty() {
                continue;
            }
            let fields = group
                .fields
                .iter()
                .map(|f| Ok((f.name.clone(), self.field(f, Raw::from_json(obj.get(&f.name)))?)))
                .collect::<Result<Vec<_>, LoadError>>()
                .map_err(|e| e.in_group(&group.name))?;
            records.push(Value::Record(Entity::from_fields(fields)));
        }
        Ok(Value::List(records))
    }

    /// Canonical text token for a value of `kind`; the inverse of `coerce_text`
    /// for values whose strings contain no delimiters.
    pub fn encode_text(&self, value: &Value) -> String {
        let Delimiters { item, pair } = self.delimiters;
        match value {
            Value::List(items) => items
                .iter()
                .map(|v| self.encode_text(v))
                .collect::<Vec<_>>()
                .join(&item.to_string()),
            Value::Tuple(parts) => parts
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(&pair.to_string()),
            Value::Map(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{}{}{}", k, pair, v))
                .collect::<Vec<_>>()
                .join(&item.to_string()),
            scalar => scalar.to_string(),
        }
    }
}

/// Items of a composite token. Empty items are dropped; whitespace-only items
/// are kept only for verbatim string lists.
fn items(text: &str, delim: char, keep_blank: bool) -> impl Iterator<Item = &str> {
    text.split(delim)
        .filter(move |s| if keep_blank { !s.is_empty() } else { !s.trim().is_empty() })
}

fn push_unique(name: &str, pairs: &mut Vec<(Value, Value)>, key: Value, value: Value) -> Result<(), LoadError> {
    if pairs.iter().any(|(k, _)| *k == key) {
        return Err(LoadError::constraint(name, format!("duplicate map key '{}'", key)));
    }
    pairs.push((key, value));
    Ok(())
}

fn scalar_text(name: &str, kind: ScalarKind, text: &str) -> Result<Value, LoadError> {
    if kind == ScalarKind::String {
        return Ok(Value::String(text.to_string()));
    }
    let trimmed = text.trim();
    if kind == ScalarKind::Bool {
        return Ok(Value::Bool(parse_bool(trimmed)));
    }
    if trimmed.is_empty() {
        return Ok(zero_value(&FieldKind::Scalar(kind)));
    }
    let mismatch = || LoadError::mismatch(name, text, kind);
    if kind.is_signed() {
        let n: i64 = trimmed.parse().map_err(|_| mismatch())?;
        return signed(name, kind, n, text);
    }
    if kind.is_unsigned() {
        let n: u64 = trimmed.parse().map_err(|_| mismatch())?;
        return unsigned(name, kind, n, text);
    }
    if kind.is_float() {
        let x: f64 = trimmed.parse().map_err(|_| mismatch())?;
        return float(name, kind, x, text);
    }
    parse_datetime(trimmed).map(Value::DateTime).ok_or_else(mismatch)
}

fn scalar_json(name: &str, kind: ScalarKind, json: &JsonValue) -> Result<Value, LoadError> {
    let mismatch = || LoadError::mismatch(name, json.to_string(), kind);
    match json {
        JsonValue::Null => Ok(zero_value(&FieldKind::Scalar(kind))),
        JsonValue::String(s) => scalar_text(name, kind, s),
        JsonValue::Bool(b) => match kind {
            ScalarKind::Bool => Ok(Value::Bool(*b)),
            ScalarKind::String => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        },
        JsonValue::Number(n) => match kind {
            ScalarKind::Bool => Ok(Value::Bool(parse_bool(&n.to_string()))),
            ScalarKind::String => Ok(Value::String(n.to_string())),
            k if k.is_signed() => signed(name, k, n.as_i64().ok_or_else(mismatch)?, &n.to_string()),
            k if k.is_unsigned() => unsigned(name, k, n.as_u64().ok_or_else(mismatch)?, &n.to_string()),
            k if k.is_float() => float(name, k, n.as_f64().ok_or_else(mismatch)?, &n.to_string()),
            _ => Err(mismatch()),
        },
        JsonValue::Array(_) | JsonValue::Object(_) => Err(mismatch()),
    }
}

fn signed(name: &str, kind: ScalarKind, n: i64, raw: &str) -> Result<Value, LoadError> {
    let (min, max) = kind.signed_range();
    if n < min || n > max {
        return Err(LoadError::mismatch(name, raw, kind));
    }
    Ok(Value::Int(n))
}

fn unsigned(name: &str, kind: ScalarKind, n: u64, raw: &str) -> Result<Value, LoadError> {
    if n > kind.unsigned_max() {
        return Err(LoadError::mismatch(name, raw, kind));
    }
    Ok(Value::UInt(n))
}

fn float(name: &str, kind: ScalarKind, x: f64, raw: &str) -> Result<Value, LoadError> {
    let x = if kind == ScalarKind::Float32 { x as f32 as f64 } else { x };
    if !x.is_finite() {
        return Err(LoadError::mismatch(name, raw, kind));
    }
    Ok(Value::Float(x))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn check_rule(name: &str, value: &Value, rule: &FieldRule) -> Result<(), LoadError> {
    match value {
        Value::List(items) => items
            .iter()
            .filter(|v| !matches!(v, Value::Tuple(_) | Value::Record(_)))
            .try_for_each(|v| check_scalar(name, v, rule)),
        Value::Tuple(_) | Value::Map(_) | Value::Record(_) => Ok(()),
        scalar => check_scalar(name, scalar, rule),
    }
}

fn check_scalar(name: &str, v: &Value, rule: &FieldRule) -> Result<(), LoadError> {
    if let Some(format) = &rule.format {
        check_format(name, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(LoadError::constraint(name, format!("must be at most {} characters", max)));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(LoadError::constraint(name, format!("must be at least {} characters", min)));
            }
        }
        if let Some(re) = &rule.pattern {
            if !re.is_match(s) {
                return Err(LoadError::constraint(name, format!("'{}' does not match required pattern", s)));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| is_allowed(v, a)) {
            return Err(LoadError::constraint(
                name,
                format!("must be one of: {:?}", allowed.iter().take(5).collect::<Vec<_>>()),
            ));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(LoadError::constraint(name, format!("must be at least {}", min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(LoadError::constraint(name, format!("must be at most {}", max)));
            }
        }
    }
    Ok(())
}

/// Whether a coerced value equals one entry of an `allowed` list. Numbers compare
/// by value across widths; strings also match any value by its text form.
fn is_allowed(v: &Value, allowed: &JsonValue) -> bool {
    match (v, allowed) {
        (Value::Bool(b), JsonValue::Bool(a)) => b == a,
        (Value::Int(n), JsonValue::Number(a)) => a.as_i64() == Some(*n) || a.as_f64() == Some(*n as f64),
        (Value::UInt(n), JsonValue::Number(a)) => a.as_u64() == Some(*n) || a.as_f64() == Some(*n as f64),
        (Value::Float(x), JsonValue::Number(a)) => a.as_f64() == Some(*x),
        (Value::String(s), JsonValue::String(a)) => s == a,
        (_, JsonValue::String(a)) => v.to_string() == *a,
        _ => false,
    }
}

fn check_format(name: &str, v: &Value, format: &str) -> Result<(), LoadError> {
    let Some(s) = v.as_str() else {
        return Ok(());
    };
    match format.to_lowercase().as_str() {
        "email" => {
            if !s.contains('@') || s.len() < 3 {
                return Err(LoadError::constraint(name, "must be a valid email"));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(LoadError::constraint(name, "must be a valid UUID"));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationRule;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(kind: &str, raw: &str) -> Result<Value, LoadError> {
        Coercer::default().coerce_text("f", &kind.parse().unwrap(), raw)
    }

    fn from_json(kind: &str, raw: JsonValue) -> Result<Value, LoadError> {
        Coercer::default().coerce("f", &kind.parse().unwrap(), Raw::Json(&raw))
    }

    #[test]
    fn bool_is_total() {
        for t in ["1", "yes", "YES", "true", "On", " on "] {
            assert!(parse_bool(t), "{}", t);
        }
        for f in ["0", "no", "false", "", "Y", "2", "truthy"] {
            assert!(!parse_bool(f), "{}", f);
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(text("int", "42").unwrap(), Value::Int(42));
        assert_eq!(text("int", " -7 ").unwrap(), Value::Int(-7));
        assert_eq!(text("uint8", "255").unwrap(), Value::UInt(255));
        assert_eq!(text("float", "1.5").unwrap(), Value::Float(1.5));
        assert_eq!(text("float32", "0.1").unwrap(), Value::Float(0.1f32 as f64));
        assert!(matches!(text("int", "abc"), Err(LoadError::TypeMismatch { .. })));
        assert!(matches!(text("int8", "128"), Err(LoadError::TypeMismatch { .. })));
        assert!(matches!(text("uint", "-1"), Err(LoadError::TypeMismatch { .. })));
        assert!(matches!(text("float", "inf"), Err(LoadError::TypeMismatch { .. })));
    }

    #[test]
    fn datetimes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(text("datetime", "2024-03-01 08:30:00").unwrap(), Value::DateTime(expected));
        assert_eq!(text("datetime", "2024-03-01T08:30:00").unwrap(), Value::DateTime(expected));
        assert!(text("datetime", "yesterday").is_err());
    }

    #[test]
    fn composites_from_text() {
        assert_eq!(
            text("int[]", "1|2|3|").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            text("(int,uint)[]", "1001=2|1002=5").unwrap(),
            Value::List(vec![
                Value::Tuple(vec![Value::Int(1001), Value::UInt(2)]),
                Value::Tuple(vec![Value::Int(1002), Value::UInt(5)]),
            ])
        );
        assert_eq!(
            text("<string,float>", "atk=1.5|def=2").unwrap(),
            Value::Map(vec![
                (Value::String("atk".into()), Value::Float(1.5)),
                (Value::String("def".into()), Value::Float(2.0)),
            ])
        );
        assert_eq!(text("(int,int)[]", "").unwrap(), Value::List(vec![]));
        assert!(matches!(text("(int,int)[]", "1=2=3"), Err(LoadError::TypeMismatch { .. })));
        assert!(matches!(text("<int,int>", "1=2|1=3"), Err(LoadError::Constraint { .. })));
        assert!(matches!(text("<int,int>", "1"), Err(LoadError::TypeMismatch { .. })));
    }

    #[test]
    fn custom_delimiters() {
        let c = Coercer::new(Delimiters { item: ';', pair: ':' });
        let kind: FieldKind = "(int,int)[]".parse().unwrap();
        let v = c.coerce_text("f", &kind, "1:2;3:4").unwrap();
        assert_eq!(c.encode_text(&v), "1:2;3:4");
    }

    #[test]
    fn json_matches_text() {
        assert_eq!(from_json("int", json!(3)).unwrap(), text("int", "3").unwrap());
        assert_eq!(from_json("float", json!(1.5)).unwrap(), text("float", "1.5").unwrap());
        assert_eq!(from_json("float", json!(100)).unwrap(), text("float", "100").unwrap());
        assert_eq!(from_json("bool", json!(true)).unwrap(), text("bool", "true").unwrap());
        assert_eq!(from_json("bool", json!(1)).unwrap(), Value::Bool(true));
        assert_eq!(from_json("string", json!(12)).unwrap(), Value::String("12".into()));
        assert_eq!(
            from_json("(int,uint)[]", json!([[1001, 2], "1002=5"])).unwrap(),
            text("(int,uint)[]", "1001=2|1002=5").unwrap()
        );
        assert_eq!(
            from_json("<int,string>", json!({"1": "a", "2": "b"})).unwrap(),
            text("<int,string>", "1=a|2=b").unwrap()
        );
        assert_eq!(
            from_json("<int,string>", json!([[1, "a"], [2, "b"]])).unwrap(),
            text("<int,string>", "1=a|2=b").unwrap()
        );
        assert!(matches!(from_json("int", json!(1.5)), Err(LoadError::TypeMismatch { .. })));
        assert!(matches!(from_json("int", json!(true)), Err(LoadError::TypeMismatch { .. })));
        assert!(matches!(from_json("int[]", json!({"a": 1})), Err(LoadError::TypeMismatch { .. })));
    }

    #[test]
    fn required_and_defaults() {
        let c = Coercer::default();
        let level = FieldDescriptor::scalar("Level", ScalarKind::Int32);
        assert_eq!(c.field(&level, Raw::Absent).unwrap(), Value::Int(0));
        assert_eq!(c.field(&level, Raw::Text("")).unwrap(), Value::Int(0));
        let name = FieldDescriptor::scalar("Name", ScalarKind::String).required();
        assert_eq!(
            c.field(&name, Raw::Text("")),
            Err(LoadError::MissingField { field: "Name".into(), at: None })
        );
        assert!(matches!(c.field(&name, Raw::Json(&json!(""))), Err(LoadError::MissingField { .. })));
        assert_eq!(c.field(&name, Raw::Text(" x ")).unwrap(), Value::String(" x ".into()));
    }

    #[test]
    fn whitespace_only_is_missing_for_non_text_kinds() {
        let c = Coercer::default();
        for kind in ["int32", "float", "bool", "datetime", "int[]", "(int,int)[]", "<int,int>"] {
            let field = FieldDescriptor::new("Level", kind.parse().unwrap()).required();
            assert_eq!(
                c.field(&field, Raw::Text("  ")),
                Err(LoadError::MissingField { field: "Level".into(), at: None }),
                "{}",
                kind
            );
            assert!(matches!(c.field(&field, Raw::Json(&json!(" \t"))), Err(LoadError::MissingField { .. })));
        }
        let name = FieldDescriptor::scalar("Name", ScalarKind::String).required();
        assert_eq!(c.field(&name, Raw::Text("  ")).unwrap(), Value::String("  ".into()));
        let tags = FieldDescriptor::new("Tags", "string[]".parse().unwrap()).required();
        assert_eq!(c.field(&tags, Raw::Text(" ")).unwrap(), Value::List(vec![Value::String(" ".into())]));
    }

    #[test]
    fn blank_items_in_string_lists_are_content() {
        assert_eq!(
            text("string[]", "a| |b|").unwrap(),
            Value::List(vec![
                Value::String("a".into()),
                Value::String(" ".into()),
                Value::String("b".into()),
            ])
        );
        assert_eq!(text("int[]", "1| |2").unwrap(), Value::List(vec![Value::Int(1), Value::Int(2)]));
        let spaces = Value::List(vec![Value::String(" ".into()), Value::String("x".into())]);
        let c = Coercer::default();
        assert_eq!(c.coerce_text("f", &"string[]".parse().unwrap(), &c.encode_text(&spaces)).unwrap(), spaces);
    }

    fn goods() -> FieldGroup {
        FieldGroup::new("Goods", 2)
            .field(FieldDescriptor::scalar("Id", ScalarKind::Int32).required())
            .field(FieldDescriptor::scalar("Count", ScalarKind::UInt16))
    }

    fn good(id: i64, count: u64) -> Value {
        Value::Record(Entity::from_fields(vec![
            ("Id".into(), Value::Int(id)),
            ("Count".into(), Value::UInt(count)),
        ]))
    }

    #[test]
    fn groups_from_cells_and_json() {
        let c = Coercer::default();
        let from_cells = c.group_text(&goods(), &["1001", "2", "", " ", "1002", ""]).unwrap();
        assert_eq!(from_cells, Value::List(vec![good(1001, 2), good(1002, 0)]));
        let from_json = c
            .group_json(&goods(), Some(&json!([{"Id": 1001, "Count": 2}, {}, {"Id": "1002"}])))
            .unwrap();
        assert_eq!(from_json, from_cells);
        assert_eq!(c.group_json(&goods(), None).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn group_errors_name_the_sub_field() {
        let c = Coercer::default();
        assert_eq!(
            c.group_text(&goods(), &["", "3"]),
            Err(LoadError::MissingField { field: "Goods.Id".into(), at: None })
        );
        assert!(matches!(
            c.group_text(&goods(), &["x", "3"]),
            Err(LoadError::TypeMismatch { field, .. }) if field == "Goods.Id"
        ));
        assert!(matches!(c.group_json(&goods(), Some(&json!({"Id": 1}))), Err(LoadError::TypeMismatch { .. })));
    }

    #[test]
    fn allowed_values_compare_by_kind() {
        let c = Coercer::default();
        let rule = FieldRule::compile(&ValidationRule {
            allowed: Some(vec![json!(1), json!(2.5), json!("7")]),
            ..Default::default()
        })
        .unwrap();
        let level = FieldDescriptor::scalar("Level", ScalarKind::UInt8).with_rule(rule.clone());
        assert!(c.field(&level, Raw::Text("1")).is_ok());
        assert!(c.field(&level, Raw::Text("7")).is_ok());
        assert!(matches!(c.field(&level, Raw::Text("3")), Err(LoadError::Constraint { .. })));
        let rate = FieldDescriptor::scalar("Rate", ScalarKind::Float64).with_rule(rule);
        assert!(c.field(&rate, Raw::Text("2.5")).is_ok());
        assert!(c.field(&rate, Raw::Text("1.0")).is_ok());
    }

    #[test]
    fn rules() {
        let c = Coercer::default();
        let rule = FieldRule::compile(&ValidationRule {
            minimum: Some(1.0),
            maximum: Some(10.0),
            ..Default::default()
        })
        .unwrap();
        let level = FieldDescriptor::scalar("Level", ScalarKind::Int32).with_rule(rule);
        assert!(c.field(&level, Raw::Text("5")).is_ok());
        assert!(matches!(c.field(&level, Raw::Text("11")), Err(LoadError::Constraint { .. })));

        let rule = FieldRule::compile(&ValidationRule {
            pattern: Some("^[a-z_]+$".into()),
            allowed: Some(vec![json!("sword"), json!("shield")]),
            ..Default::default()
        })
        .unwrap();
        let tag = FieldDescriptor::scalar("Tag", ScalarKind::String).with_rule(rule);
        assert!(c.field(&tag, Raw::Text("sword")).is_ok());
        assert!(matches!(c.field(&tag, Raw::Text("Sword")), Err(LoadError::Constraint { .. })));
        assert!(matches!(c.field(&tag, Raw::Text("bow")), Err(LoadError::Constraint { .. })));

        let rule = FieldRule::compile(&ValidationRule {
            format: Some("uuid".into()),
            ..Default::default()
        })
        .unwrap();
        let id = FieldDescriptor::scalar("Id", ScalarKind::String).with_rule(rule);
        assert!(c.field(&id, Raw::Text("67e55044-10b1-426f-9247-bb680e5fe0c8")).is_ok());
        assert!(c.field(&id, Raw::Text("not-a-uuid")).is_err());
    }
}
