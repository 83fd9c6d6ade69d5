use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::error::DataError;
use super::loader::load_table;
use super::model::Table;

/// Something that can produce a table for a path.
pub trait TableSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<Table, DataError>;
}

/// Reads tables from disk with [`load_table`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl TableSource for FileSource {
    fn load(&self, path: &Path) -> Result<Table, DataError> {
        load_table(path)
    }
}

/// Cache key: the source path exactly as requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey(PathBuf);

impl From<&Path> for SourceKey {
    fn from(path: &Path) -> Self {
        SourceKey(path.to_path_buf())
    }
}

#[derive(Debug)]
struct Entry {
    table: Arc<Table>,
    loaded_at: Instant,
}

/// Memoizing table loader shared by every view of a session.
///
/// Each source is read at most once until it is invalidated or its entry
/// outlives the TTL. Failed loads are not cached. Two threads racing on the
/// same cold key may both read the source; the first stored result wins.
pub struct TableCache<S: TableSource = FileSource> {
    source: S,
    ttl: Option<Duration>,
    entries: RwLock<HashMap<SourceKey, Entry>>,
}

impl TableCache<FileSource> {
    pub fn new() -> Self {
        Self::with_source(FileSource)
    }
}

impl Default for TableCache<FileSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TableSource> TableCache<S> {
    pub fn with_source(source: S) -> Self {
        TableCache {
            source,
            ttl: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Entries older than `ttl` are reloaded on next access.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the cached table for `path`, loading it on first use.
    pub fn get(&self, path: &Path) -> Result<Arc<Table>, DataError> {
        let key = SourceKey::from(path);

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&key) {
                if self.is_fresh(entry) {
                    log::debug!("cache hit: {}", path.display());
                    return Ok(entry.table.clone());
                }
            }
        }

        log::debug!("cache miss: {}", path.display());
        let table = Arc::new(self.source.load(path)?);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            // Another caller stored a fresh copy while we were loading.
            Some(existing) if self.is_fresh(existing) => Ok(existing.table.clone()),
            _ => {
                entries.insert(
                    key,
                    Entry {
                        table: table.clone(),
                        loaded_at: Instant::now(),
                    },
                );
                Ok(table)
            }
        }
    }

    /// Drop the entry for `path`; the next `get` reloads it.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&SourceKey::from(path))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        self.ttl.map_or(true, |ttl| entry.loaded_at.elapsed() < ttl)
    }
}
