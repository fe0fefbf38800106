//! Tabular SDK: schema-driven loading of CSV and JSON configuration tables into typed in-memory stores.

pub mod coerce;
pub mod config;
pub mod error;
pub mod json;
pub mod reader;
pub mod registry;
pub mod settings;
pub mod state;
pub mod store;
pub mod table;
pub mod value;

pub use coerce::{parse_bool, Coercer, Raw};
pub use config::{load_manifest, ConfigType, FieldDescriptor, FieldKind, ScalarKind, Schema, Shape, SourceFormat};
pub use error::{ConfigError, LoadError, ReadError, RegistryError, RowRef, TypeLoadError};
pub use reader::{from_fn, FnReader, FsReader, MemoryReader, Reader, ZipReader};
pub use registry::Registry;
pub use settings::{Delimiters, FailurePolicy, Settings};
pub use state::LoadState;
pub use store::{Store, TableStore};
pub use value::{Entity, Value};
