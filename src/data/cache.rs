use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;

use super::error::LoadError;
use super::loader;
use super::model::{Table, TableSchema};

/// What a file looked like when it was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signature {
    modified: Option<SystemTime>,
    len: u64,
}

impl Signature {
    fn of(path: &Path) -> Result<Self, LoadError> {
        let meta = std::fs::metadata(path).map_err(|e| LoadError::io(path, e))?;
        Ok(Signature {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

struct Entry {
    signature: Signature,
    schema: TableSchema,
    table: Arc<Table>,
}

/// Loaded tables keyed on canonical path, reused while the file's
/// modification time, length and the requested schema stay the same.
#[derive(Default)]
pub struct TableCache {
    entries: HashMap<PathBuf, Entry>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return the cached table for `path`, loading it if the file changed
    /// since the last call or was never loaded.
    pub fn load(&mut self, path: &Path, schema: &TableSchema) -> Result<Arc<Table>, LoadError> {
        let key = path.canonicalize().map_err(|e| LoadError::io(path, e))?;
        let signature = Signature::of(&key)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.signature == signature && &entry.schema == schema {
                debug!("cache hit for {}", key.display());
                return Ok(Arc::clone(&entry.table));
            }
        }

        let table = Arc::new(loader::load(&key, schema)?);
        self.entries.insert(
            key,
            Entry {
                signature,
                schema: schema.clone(),
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }
}
