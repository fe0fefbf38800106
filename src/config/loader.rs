//! Load config types from a JSON manifest.

use crate::config::types::*;
use crate::config::{validate, ConfigType, FieldDescriptor, FieldGroup, FieldKind, FieldRule, Schema};
use crate::error::ConfigError;

/// Parse manifest JSON text.
pub fn parse_manifest(text: &str) -> Result<ManifestConfig, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Manifest(e.to_string()))
}

/// Build resolved config types from a manifest, in declared order.
pub fn resolve(manifest: &ManifestConfig) -> Result<Vec<ConfigType>, ConfigError> {
    let types = manifest
        .types
        .iter()
        .map(resolve_type)
        .collect::<Result<Vec<_>, _>>()?;
    validate(&types)?;
    Ok(types)
}

fn resolve_type(ty: &TypeConfig) -> Result<ConfigType, ConfigError> {
    let fields = ty
        .fields
        .iter()
        .map(|f| resolve_field(&ty.name, f))
        .collect::<Result<Vec<_>, _>>()?;
    let groups = ty
        .groups
        .iter()
        .map(|g| resolve_group(&ty.name, g))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ConfigType {
        name: ty.name.clone(),
        resource: ty.resource.clone(),
        format: ty.format.unwrap_or_else(|| SourceFormat::from_resource(&ty.resource)),
        shape: ty.shape,
        keys: ty.key.as_ref().map(KeyColumns::to_vec).unwrap_or_default(),
        schema: Schema::new(fields).with_groups(groups),
    })
}

fn resolve_group(type_name: &str, g: &GroupConfig) -> Result<FieldGroup, ConfigError> {
    let owner = format!("{}.{}", type_name, g.name);
    let fields = g
        .fields
        .iter()
        .map(|f| resolve_field(&owner, f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FieldGroup {
        name: g.name.clone(),
        start: g.start,
        end: g.end,
        fields,
    })
}

fn resolve_field(type_name: &str, f: &FieldConfig) -> Result<FieldDescriptor, ConfigError> {
    let kind: FieldKind = f.type_.parse()?;
    let rule = match &f.rule {
        Some(r) => {
            let compiled = FieldRule::compile(r).map_err(|e| {
                ConfigError::Validation(format!("invalid pattern for {}.{}: {}", type_name, f.name, e))
            })?;
            Some(compiled).filter(|r| !r.is_empty())
        }
        None => None,
    };
    Ok(FieldDescriptor {
        name: f.name.clone(),
        kind,
        required: f.required,
        rule,
    })
}

/// Parse and resolve manifest text in one step.
pub fn load_manifest(text: &str) -> Result<Vec<ConfigType>, ConfigError> {
    let manifest = parse_manifest(text)?;
    tracing::debug!(types = manifest.types.len(), "manifest parsed");
    resolve(&manifest)
}
