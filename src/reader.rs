//! Source readers: map a resource key to raw text. The only I/O the engine does goes through here.

use crate::error::ReadError;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zip::result::ZipError;
use zip::ZipArchive;

/// Suffixes tried, in order, when a key has no matching resource as given.
const PROBE_SUFFIXES: &[&str] = &["", ".csv", "_config.json", ".json"];

pub trait Reader {
    fn read(&self, key: &str) -> Result<String, ReadError>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn read(&self, key: &str) -> Result<String, ReadError> {
        (**self).read(key)
    }
}

/// Adapts a closure into a reader.
pub struct FnReader<F>(pub F);

impl<F> Reader for FnReader<F>
where
    F: Fn(&str) -> Result<String, ReadError>,
{
    fn read(&self, key: &str) -> Result<String, ReadError> {
        (self.0)(key)
    }
}

pub fn from_fn<F>(f: F) -> FnReader<F>
where
    F: Fn(&str) -> Result<String, ReadError>,
{
    FnReader(f)
}

/// Reads resources from files under a root directory.
#[derive(Clone, Debug)]
pub struct FsReader {
    root: PathBuf,
}

impl FsReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsReader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, key: &str) -> Option<PathBuf> {
        PROBE_SUFFIXES
            .iter()
            .map(|suffix| self.root.join(format!("{}{}", key, suffix)))
            .find(|p| p.is_file())
    }
}

impl Reader for FsReader {
    fn read(&self, key: &str) -> Result<String, ReadError> {
        let path = self
            .locate(key)
            .ok_or_else(|| ReadError::NotFound(format!("{} under {}", key, self.root.display())))?;
        tracing::debug!(path = %path.display(), "read resource");
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReadError::NotFound(path.display().to_string()),
            _ => ReadError::Io(format!("{}: {}", path.display(), e)),
        })
    }
}

/// In-memory resources keyed exactly.
#[derive(Clone, Debug, Default)]
pub struct MemoryReader {
    resources: HashMap<String, String>,
}

impl MemoryReader {
    pub fn new() -> Self {
        MemoryReader {
            resources: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, text);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.resources.insert(key.into(), text.into());
    }
}

impl Reader for MemoryReader {
    fn read(&self, key: &str) -> Result<String, ReadError> {
        self.resources
            .get(key)
            .cloned()
            .ok_or_else(|| ReadError::NotFound(key.to_string()))
    }
}

/// Reads resources from entries of a zip bundle held in memory.
pub struct ZipReader {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
}

impl ZipReader {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ReadError> {
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| ReadError::Bundle(e.to_string()))?;
        Ok(ZipReader {
            archive: Mutex::new(archive),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReadError::NotFound(path.display().to_string()),
            _ => ReadError::Io(format!("{}: {}", path.display(), e)),
        })?;
        Self::from_bytes(bytes)
    }

    pub fn entry_names(&self) -> Result<Vec<String>, ReadError> {
        let archive = self.archive.lock().map_err(|e| ReadError::Bundle(e.to_string()))?;
        Ok(archive.file_names().map(str::to_string).collect())
    }
}

fn read_zip_entry_to_string<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, ReadError> {
    let mut f = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => ReadError::NotFound(name.to_string()),
        other => ReadError::Bundle(other.to_string()),
    })?;
    let mut s = String::new();
    f.read_to_string(&mut s).map_err(|e| ReadError::Bundle(format!("{}: {}", name, e)))?;
    Ok(s)
}

impl Reader for ZipReader {
    fn read(&self, key: &str) -> Result<String, ReadError> {
        let mut archive = self.archive.lock().map_err(|e| ReadError::Bundle(e.to_string()))?;
        for suffix in PROBE_SUFFIXES {
            let name = format!("{}{}", key, suffix);
            match read_zip_entry_to_string(&mut archive, &name) {
                Err(ReadError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(ReadError::NotFound(key.to_string()))
    }
}
