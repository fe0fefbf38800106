//! Resolved config types: manifest validated and compiled for the load pass.

use crate::config::{FieldKind, ScalarKind, Shape, SourceFormat, ValidationRule};
use regex::Regex;
use serde_json::Value as JsonValue;

/// Validation rule with its pattern compiled.
#[derive(Clone, Debug, Default)]
pub struct FieldRule {
    pub format: Option<String>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<Regex>,
    pub allowed: Option<Vec<JsonValue>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl FieldRule {
    pub fn is_empty(&self) -> bool {
        self.format.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.allowed.is_none()
            && self.minimum.is_none()
            && self.maximum.is_none()
    }

    pub(crate) fn compile(rule: &ValidationRule) -> Result<Self, regex::Error> {
        let pattern = match &rule.pattern {
            Some(p) => Some(Regex::new(p)?),
            None => None,
        };
        Ok(FieldRule {
            format: rule.format.clone(),
            min_length: rule.min_length,
            max_length: rule.max_length,
            pattern,
            allowed: rule.allowed.clone(),
            minimum: rule.minimum,
            maximum: rule.maximum,
        })
    }
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub rule: Option<FieldRule>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
            required: false,
            rule: None,
        }
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, FieldKind::Scalar(kind))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rule = Some(rule);
        self
    }
}

/// Columns `start..=end` (1-based) read as consecutive records of `fields`.
/// In JSON the same field is an array of objects.
#[derive(Clone, Debug)]
pub struct FieldGroup {
    pub name: String,
    pub start: usize,
    /// Last column of the run; `None` runs to the last header column.
    pub end: Option<usize>,
    pub fields: Vec<FieldDescriptor>,
}

impl FieldGroup {
    pub fn new(name: impl Into<String>, start: usize) -> Self {
        FieldGroup {
            name: name.into(),
            start,
            end: None,
            fields: Vec::new(),
        }
    }

    pub fn end(mut self, end: usize) -> Self {
        self.end = Some(end);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Columns per record.
    pub fn step(&self) -> usize {
        self.fields.len()
    }

    /// 0-based column span for a header of `width` columns, if the run fits it
    /// in whole records.
    pub fn columns(&self, width: usize) -> Option<std::ops::Range<usize>> {
        let begin = self.start.checked_sub(1)?;
        let end = self.end.unwrap_or(width);
        let step = self.step();
        if step == 0 || end > width || end <= begin || (end - begin) % step != 0 {
            return None;
        }
        Some(begin..end)
    }
}

/// Ordered field list of one config type, plus its column groups.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
    pub groups: Vec<FieldGroup>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Schema {
            fields,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<FieldGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&FieldGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Entity width: plain fields plus one per group.
    pub fn len(&self) -> usize {
        self.fields.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }
}

/// One registered configuration type: where its text comes from, how to decode it
/// and what shape of store it fills.
#[derive(Clone, Debug)]
pub struct ConfigType {
    pub name: String,
    pub resource: String,
    pub format: SourceFormat,
    pub shape: Shape,
    /// Key fields for table lookups, most significant first (table shape only).
    pub keys: Vec<String>,
    pub schema: Schema,
}

impl ConfigType {
    pub fn table(name: impl Into<String>, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        ConfigType {
            name: name.into(),
            format: SourceFormat::from_resource(&resource),
            resource,
            shape: Shape::Table,
            keys: Vec::new(),
            schema: Schema::default(),
        }
    }

    pub fn singleton(name: impl Into<String>, resource: impl Into<String>) -> Self {
        ConfigType {
            shape: Shape::Singleton,
            ..Self::table(name, resource)
        }
    }

    pub fn format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    /// Append a key field; call again for a composite key.
    pub fn key(mut self, field: impl Into<String>) -> Self {
        self.keys.push(field.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.schema.fields.push(field);
        self
    }

    pub fn group(mut self, group: FieldGroup) -> Self {
        self.schema.groups.push(group);
        self
    }
}
