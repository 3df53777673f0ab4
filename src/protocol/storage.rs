//! Key-value storage the auth replicas live in.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use tracing::debug;

use super::StorageError;

/// String key-value interface, shaped like browser local storage.
///
/// Batches are applied as one unit: readers never observe part of a
/// `set_many`, and `get_many` returns a single consistent snapshot.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns an error when the store cannot be read.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError>;

    /// # Errors
    /// Returns an error when the batch cannot be persisted; nothing of it is
    /// applied in that case.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// # Errors
    /// Returns an error when the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_many(&[key])?.into_iter().next().flatten())
    }

    /// # Errors
    /// Returns an error when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }
}

fn lookup(entries: &BTreeMap<String, String>, keys: &[&str]) -> Vec<Option<String>> {
    keys.iter().map(|key| entries.get(*key).cloned()).collect()
}

fn apply(entries: &mut BTreeMap<String, String>, batch: &[(&str, &str)]) {
    for (key, value) in batch {
        entries.insert((*key).to_string(), (*value).to_string());
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(lookup(&entries, keys))
    }

    fn set_many(&self, batch: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        apply(&mut entries, batch);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every batch.
///
/// Calls block on file I/O; async callers run them on the blocking pool.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!("opened file store {} with {} keys", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        // replace via a sibling temp file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(lookup(&entries, keys))
    }

    fn set_many(&self, batch: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;

        let mut next = entries.clone();
        apply(&mut next, batch);
        self.persist(&next)?;
        *entries = next;

        Ok(())
    }
}

/// View of another store with every key under `<namespace>/`.
pub struct ScopedStore {
    inner: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl ScopedStore {
    #[must_use]
    pub fn new(inner: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            inner,
            prefix: format!("{namespace}/"),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl KeyValueStore for ScopedStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let scoped: Vec<String> = keys.iter().map(|key| self.key(key)).collect();
        let scoped: Vec<&str> = scoped.iter().map(String::as_str).collect();
        self.inner.get_many(&scoped)
    }

    fn set_many(&self, batch: &[(&str, &str)]) -> Result<(), StorageError> {
        let scoped: Vec<(String, &str)> = batch
            .iter()
            .map(|(key, value)| (self.key(key), *value))
            .collect();
        let scoped: Vec<(&str, &str)> = scoped
            .iter()
            .map(|(key, value)| (key.as_str(), *value))
            .collect();
        self.inner.set_many(&scoped)
    }
}
