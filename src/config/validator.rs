//! Config type validation: unique names, unique fields, usable key fields, column groups.

use crate::config::{ConfigType, FieldDescriptor, FieldGroup, Shape};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate_type(ty: &ConfigType) -> Result<(), ConfigError> {
    if ty.name.trim().is_empty() {
        return Err(ConfigError::Validation("config type name must not be empty".into()));
    }
    if ty.schema.is_empty() {
        return Err(ConfigError::Validation(format!("config type {} has no fields", ty.name)));
    }

    let mut names = HashSet::new();
    for f in &ty.schema.fields {
        check_field_name(&ty.name, f, &mut names)?;
    }
    for g in &ty.schema.groups {
        validate_group(ty, g, &mut names)?;
    }

    let mut keys = HashSet::new();
    for key in &ty.keys {
        let invalid = || ConfigError::InvalidKey {
            type_name: ty.name.clone(),
            field: key.clone(),
        };
        if ty.shape == Shape::Singleton || !keys.insert(key.as_str()) {
            return Err(invalid());
        }
        let field = ty.schema.field(key).ok_or_else(invalid)?;
        if !field.kind.is_scalar() {
            return Err(invalid());
        }
    }
    Ok(())
}

fn check_field_name<'a>(type_name: &str, f: &'a FieldDescriptor, names: &mut HashSet<&'a str>) -> Result<(), ConfigError> {
    if f.name.is_empty() {
        return Err(ConfigError::Validation(format!("config type {} has an unnamed field", type_name)));
    }
    if !names.insert(f.name.as_str()) {
        return Err(ConfigError::DuplicateField {
            type_name: type_name.to_string(),
            field: f.name.clone(),
        });
    }
    Ok(())
}

fn validate_group<'a>(ty: &'a ConfigType, g: &'a FieldGroup, names: &mut HashSet<&'a str>) -> Result<(), ConfigError> {
    let bad = |reason: &str| ConfigError::Validation(format!("group {}.{}: {}", ty.name, g.name, reason));
    if ty.shape == Shape::Singleton {
        return Err(bad("groups need a table shape"));
    }
    if g.name.is_empty() {
        return Err(ConfigError::Validation(format!("config type {} has an unnamed group", ty.name)));
    }
    if !names.insert(g.name.as_str()) {
        return Err(ConfigError::DuplicateField {
            type_name: ty.name.clone(),
            field: g.name.clone(),
        });
    }
    if g.fields.is_empty() {
        return Err(bad("no fields"));
    }
    if g.start == 0 {
        return Err(bad("columns are numbered from 1"));
    }
    if let Some(end) = g.end {
        let span = (end + 1).saturating_sub(g.start);
        if span == 0 || span % g.step() != 0 {
            return Err(bad("column range must hold whole records"));
        }
    }
    let mut inner = HashSet::new();
    for f in &g.fields {
        check_field_name(&format!("{}.{}", ty.name, g.name), f, &mut inner)?;
    }
    Ok(())
}

/// Validate a whole declared set, in order.
pub fn validate(types: &[ConfigType]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for ty in types {
        validate_type(ty)?;
        if !seen.insert(ty.name.as_str()) {
            return Err(ConfigError::DuplicateType(ty.name.clone()));
        }
    }
    Ok(())
}
