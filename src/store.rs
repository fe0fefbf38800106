//! Backing stores for loaded config types: list tables and singletons.

use crate::config::Shape;
use crate::error::{LoadError, RowRef};
use crate::value::Entity;
use std::collections::HashMap;

/// Ordered entities, one per non-blank source row, indexed by their key fields.
#[derive(Clone, Debug, Default)]
pub struct TableStore {
    entities: Vec<Entity>,
    keys: Vec<String>,
    /// Text form of each entity's key fields, parallel to `entities`.
    key_texts: Vec<Vec<String>>,
    index: HashMap<Vec<String>, usize>,
}

impl TableStore {
    /// Build from decoded rows; the full key must be unique when key fields are set.
    pub fn new(keys: &[String], rows: Vec<(RowRef, Entity)>) -> Result<Self, LoadError> {
        let mut index = HashMap::new();
        let mut entities = Vec::with_capacity(rows.len());
        let mut key_texts = Vec::new();
        for (at, entity) in rows {
            if !keys.is_empty() {
                let text: Vec<String> = keys
                    .iter()
                    .map(|k| entity.get(k).map(|v| v.to_string()).unwrap_or_default())
                    .collect();
                if index.insert(text.clone(), entities.len()).is_some() {
                    return Err(LoadError::DuplicateKey {
                        key: text.join(","),
                        at: Some(at),
                    });
                }
                key_texts.push(text);
            }
            entities.push(entity);
        }
        Ok(TableStore {
            entities,
            keys: keys.to_vec(),
            key_texts,
            index,
        })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, idx: usize) -> Option<&Entity> {
        self.entities.get(idx)
    }

    /// Look up by the text form of every key field, in key order.
    /// `None` unless exactly one value per key field is given.
    pub fn find(&self, key: &[&str]) -> Option<&Entity> {
        if key.is_empty() || key.len() != self.keys.len() {
            return None;
        }
        let key: Vec<String> = key.iter().map(|k| k.to_string()).collect();
        self.index.get(&key).and_then(|&i| self.entities.get(i))
    }

    /// Every entity whose leading key fields equal `prefix`, in source order.
    pub fn range(&self, prefix: &[&str]) -> Vec<&Entity> {
        if prefix.is_empty() {
            return self.entities.iter().collect();
        }
        if prefix.len() > self.keys.len() {
            return Vec::new();
        }
        self.key_texts
            .iter()
            .zip(&self.entities)
            .filter(|(text, _)| text.iter().zip(prefix).all(|(a, b)| a == b))
            .map(|(_, e)| e)
            .collect()
    }

    pub fn key_fields(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[derive(Clone, Debug)]
pub enum Store {
    Table(TableStore),
    Singleton(Entity),
}

impl Store {
    pub fn shape(&self) -> Shape {
        match self {
            Store::Table(_) => Shape::Table,
            Store::Singleton(_) => Shape::Singleton,
        }
    }

    pub fn as_table(&self) -> Option<&TableStore> {
        match self {
            Store::Table(t) => Some(t),
            Store::Singleton(_) => None,
        }
    }

    pub fn as_singleton(&self) -> Option<&Entity> {
        match self {
            Store::Singleton(e) => Some(e),
            Store::Table(_) => None,
        }
    }

    /// Entity count: rows for a table, 1 for a singleton.
    pub fn len(&self) -> usize {
        match self {
            Store::Table(t) => t.len(),
            Store::Singleton(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
