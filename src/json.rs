//! JSON decoder: array-of-objects or single object to entities, through the same coercion as CSV.

use crate::coerce::{Coercer, Raw};
use crate::config::Schema;
use crate::error::{LoadError, RowRef};
use crate::value::Entity;
use serde_json::{Map, Value as JsonValue};

fn parse(text: &str) -> Result<JsonValue, LoadError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    serde_json::from_str(text).map_err(|e| LoadError::MalformedJson {
        at: None,
        reason: e.to_string(),
    })
}

fn type_name_of_json(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn object_entity(coercer: &Coercer, schema: &Schema, obj: &Map<String, JsonValue>) -> Result<Entity, LoadError> {
    let mut entity = coercer.entity(schema, |name| Raw::from_json(obj.get(name)))?;
    for group in &schema.groups {
        entity.push(group.name.clone(), coercer.group_json(group, obj.get(&group.name))?);
    }
    Ok(entity)
}

/// Decode a JSON array of objects. Empty objects are skipped like blank CSV rows.
pub fn decode_table(text: &str, schema: &Schema, coercer: &Coercer) -> Result<Vec<(RowRef, Entity)>, LoadError> {
    let root = parse(text)?;
    let elems = match &root {
        JsonValue::Array(elems) => elems,
        other => {
            return Err(LoadError::MalformedJson {
                at: None,
                reason: format!("expected an array of objects, got {}", type_name_of_json(other)),
            })
        }
    };
    let mut out = Vec::with_capacity(elems.len());
    for (i, elem) in elems.iter().enumerate() {
        let obj = elem.as_object().ok_or_else(|| LoadError::MalformedJson {
            at: Some(RowRef::Index(i)),
            reason: format!("expected an object, got {}", type_name_of_json(elem)),
        })?;
        if obj.is_empty() {
            continue;
        }
        let entity = object_entity(coercer, schema, obj).map_err(|e| e.at(RowRef::Index(i)))?;
        out.push((RowRef::Index(i), entity));
    }
    Ok(out)
}

/// Decode a single JSON object.
pub fn decode_object(text: &str, schema: &Schema, coercer: &Coercer) -> Result<Entity, LoadError> {
    match parse(text)? {
        JsonValue::Object(obj) => object_entity(coercer, schema, &obj),
        other => Err(LoadError::MalformedJson {
            at: None,
            reason: format!("expected an object, got {}", type_name_of_json(&other)),
        }),
    }
}
