//! Config registry: owns the reader, drives each registered type through one load and serves the stores.

use crate::coerce::Coercer;
use crate::config::{load_manifest, validate_type, ConfigType, Shape, SourceFormat};
use crate::error::{ConfigError, LoadError, RegistryError, TypeLoadError};
use crate::reader::Reader;
use crate::settings::{Delimiters, FailurePolicy, Settings};
use crate::state::{EntryState, LoadState};
use crate::store::{Store, TableStore};
use crate::value::Entity;
use crate::{json, table};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

struct Entry {
    config_type: ConfigType,
    state: EntryState,
}

/// Registry of config types. Load with `&mut self`, then share `&self` for reads;
/// stores never change after they are published.
pub struct Registry<R> {
    reader: R,
    coercer: Coercer,
    policy: FailurePolicy,
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl<R: Reader> Registry<R> {
    pub fn new(reader: R) -> Self {
        Registry {
            reader,
            coercer: Coercer::default(),
            policy: FailurePolicy::default(),
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn with_settings(reader: R, settings: &Settings) -> Self {
        Self::new(reader)
            .with_delimiters(settings.delimiters)
            .with_policy(settings.failure_policy)
    }

    /// Registry with every type of a JSON manifest registered in declared order.
    pub fn from_manifest(reader: R, manifest: &str) -> Result<Self, RegistryError> {
        let mut registry = Self::new(reader);
        registry.register_all(load_manifest(manifest)?)?;
        Ok(registry)
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.coercer = Coercer::new(delimiters);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn register(&mut self, config_type: ConfigType) -> Result<(), RegistryError> {
        validate_type(&config_type)?;
        if self.by_name.contains_key(&config_type.name) {
            return Err(ConfigError::DuplicateType(config_type.name).into());
        }
        self.by_name.insert(config_type.name.clone(), self.entries.len());
        self.entries.push(Entry {
            config_type,
            state: EntryState::Unloaded,
        });
        Ok(())
    }

    pub fn register_all(&mut self, types: impl IntoIterator<Item = ConfigType>) -> Result<(), RegistryError> {
        for ty in types {
            self.register(ty)?;
        }
        Ok(())
    }

    /// Load one type. No-op when already loaded; a failed type reports its recorded error.
    pub fn load(&mut self, name: &str) -> Result<(), RegistryError> {
        let idx = self.index_of(name)?;
        self.load_entry(idx).map_err(RegistryError::Load)
    }

    /// Load every registered type in registration order, honouring the failure policy.
    pub fn load_all(&mut self) -> Result<(), RegistryError> {
        tracing::info!(types = self.entries.len(), policy = ?self.policy, "loading all config types");
        let mut failures = Vec::new();
        for idx in 0..self.entries.len() {
            if let Err(e) = self.load_entry(idx) {
                match self.policy {
                    FailurePolicy::AbortOnFirst => return Err(RegistryError::Load(e)),
                    FailurePolicy::Continue => failures.push(e),
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Aggregate(failures))
        }
    }

    fn load_entry(&mut self, idx: usize) -> Result<(), TypeLoadError> {
        let entry = &mut self.entries[idx];
        match &entry.state {
            EntryState::Loaded(_) => return Ok(()),
            EntryState::Failed(e) => return Err(e.clone()),
            EntryState::Unloaded | EntryState::Loading => {}
        }
        entry.state = EntryState::Loading;
        let ty = &entry.config_type;
        tracing::debug!(type_name = %ty.name, resource = %ty.resource, "loading config type");

        let result = self
            .reader
            .read(&ty.resource)
            .map_err(LoadError::from)
            .and_then(|text| decode(ty, &text, &self.coercer));
        match result {
            Ok(store) => {
                tracing::info!(type_name = %ty.name, rows = store.len(), "config type loaded");
                entry.state = EntryState::Loaded(store);
                Ok(())
            }
            Err(error) => {
                let err = TypeLoadError {
                    type_name: ty.name.clone(),
                    resource: ty.resource.clone(),
                    error,
                };
                tracing::warn!(error = %err, "config type failed to load");
                entry.state = EntryState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn index_of(&self, name: &str) -> Result<usize, RegistryError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }
}

impl<R> Registry<R> {
    pub fn state(&self, name: &str) -> Option<LoadState> {
        let idx = self.by_name.get(name)?;
        Some(self.entries[*idx].state.status())
    }

    /// Registered type names in load order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.config_type.name.as_str())
    }

    pub fn config_type(&self, name: &str) -> Option<&ConfigType> {
        let idx = self.by_name.get(name)?;
        Some(&self.entries[*idx].config_type)
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.iter().all(|e| matches!(e.state, EntryState::Loaded(_)))
    }

    pub fn store(&self, name: &str) -> Result<&Store, RegistryError> {
        let idx = self
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        match &self.entries[*idx].state {
            EntryState::Loaded(store) => Ok(store),
            _ => Err(RegistryError::NotLoaded(name.to_string())),
        }
    }

    pub fn table(&self, name: &str) -> Result<&TableStore, RegistryError> {
        self.store(name)?.as_table().ok_or_else(|| RegistryError::ShapeMismatch {
            type_name: name.to_string(),
            expected: Shape::Table.name(),
        })
    }

    /// All entities of a table type, in source order.
    pub fn get_data(&self, name: &str) -> Result<&[Entity], RegistryError> {
        Ok(self.table(name)?.entities())
    }

    /// Entity of a table type by the text form of all its key fields, in key order.
    pub fn find(&self, name: &str, key: &[&str]) -> Result<Option<&Entity>, RegistryError> {
        let table = self.table(name)?;
        check_arity(name, table, key.len(), |expected, found| expected == found)?;
        Ok(table.find(key))
    }

    /// Entities of a table type whose leading key fields equal `prefix`, in source order.
    pub fn range(&self, name: &str, prefix: &[&str]) -> Result<Vec<&Entity>, RegistryError> {
        let table = self.table(name)?;
        check_arity(name, table, prefix.len(), |expected, found| found <= expected)?;
        Ok(table.range(prefix))
    }

    /// The entity of a singleton type.
    pub fn get_instance(&self, name: &str) -> Result<&Entity, RegistryError> {
        self.store(name)?.as_singleton().ok_or_else(|| RegistryError::ShapeMismatch {
            type_name: name.to_string(),
            expected: Shape::Singleton.name(),
        })
    }

    /// Table rows deserialized into a caller struct.
    pub fn get_typed<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, RegistryError> {
        self.get_data(name)?
            .iter()
            .map(|e| e.deserialize().map_err(|err| deserialize_error(name, err)))
            .collect()
    }

    pub fn get_instance_typed<T: DeserializeOwned>(&self, name: &str) -> Result<T, RegistryError> {
        self.get_instance(name)?
            .deserialize()
            .map_err(|err| deserialize_error(name, err))
    }
}

fn check_arity(
    name: &str,
    table: &TableStore,
    found: usize,
    fits: impl Fn(usize, usize) -> bool,
) -> Result<(), RegistryError> {
    let expected = table.key_fields().len();
    if expected == 0 || !fits(expected, found) {
        return Err(RegistryError::KeyArity {
            type_name: name.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn deserialize_error(name: &str, err: serde_json::Error) -> RegistryError {
    RegistryError::Deserialize {
        type_name: name.to_string(),
        reason: err.to_string(),
    }
}

/// Decode raw text into a store for the type's format and shape.
pub fn decode(ty: &ConfigType, text: &str, coercer: &Coercer) -> Result<Store, LoadError> {
    let keys = &ty.keys;
    match (ty.format, ty.shape) {
        (SourceFormat::Csv, Shape::Table) => {
            TableStore::new(keys, table::decode_table(text, &ty.schema, coercer)?).map(Store::Table)
        }
        (SourceFormat::Json, Shape::Table) => {
            TableStore::new(keys, json::decode_table(text, &ty.schema, coercer)?).map(Store::Table)
        }
        (SourceFormat::Csv, Shape::Singleton) => table::decode_key_values(text, &ty.schema, coercer).map(Store::Singleton),
        (SourceFormat::Json, Shape::Singleton) => json::decode_object(text, &ty.schema, coercer).map(Store::Singleton),
    }
}
