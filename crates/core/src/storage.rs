//! Key/value storage adapter
//!
//! Session state (bearer token, principal) and the one-shot reload marker are
//! kept behind [`KeyValueStore`], so hosts can choose where they live:
//!
//! - [`MemoryStore`]: process-local map, the short-lived "session" area
//! - [`FileStore`]: JSON file under a directory, the persistent area
//! - [`UnavailableStore`]: disabled storage, every read is absent
//!
//! Store operations never fail. A broken backing store degrades to absent
//! values and is logged, so callers only ever observe a logged-out state.

use crate::error::{Error, Result, ResultExt};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Well-known storage keys
pub mod keys {
    /// Bearer token of the current session
    pub const TOKEN: &str = "wecare_token";
    /// Serialized principal of the current session
    pub const USER: &str = "wecare_user";
    /// Token key written by older releases, removed on logout
    pub const LEGACY_JWT: &str = "jwt";
    /// Marker set once a forced reload happened in this browsing session
    pub const RELOAD_ATTEMPTED: &str = "wecare_reload_attempted";
}

/// Minimal key/value storage contract
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value
    fn set(&self, key: &str, value: &str);
    /// Delete a value
    fn remove(&self, key: &str);
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Store that behaves like disabled browser storage
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) {}

    fn remove(&self, _key: &str) {}
}

/// File name used inside the storage directory
const STORE_FILE: &str = "session.json";

/// JSON file-backed store with write-through persistence
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store inside `dir`
    ///
    /// A corrupt store file is discarded rather than reported, matching the
    /// "degrade to logged out" contract of the adapter.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| Error::storage_unavailable(dir).with_source(e))?;

        let path = dir.join(STORE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Discarding corrupt store file");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(Error::from(e)).context(format!("Reading {}", path.display()));
            }
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut HashMap<String, String>)) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
        if let Err(e) = self.flush(&guard) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist store");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.mutate(|entries| {
            entries.remove(key);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set(keys::TOKEN, "abc");
        assert_eq!(store.get(keys::TOKEN).as_deref(), Some("abc"));

        store.remove(keys::TOKEN);
        assert!(store.get(keys::TOKEN).is_none());
    }

    #[test]
    fn test_unavailable_store_is_noop() {
        let store = UnavailableStore;
        store.set(keys::USER, "{}");
        assert!(store.get(keys::USER).is_none());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = TempDir::new().unwrap();

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set(keys::TOKEN, "persisted");
            store.set(keys::USER, r#"{"email":"a@b.com"}"#);
            store.remove(keys::USER);
        }

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(keys::TOKEN).as_deref(), Some("persisted"));
        assert!(reopened.get(keys::USER).is_none());
    }

    #[test]
    fn test_file_store_discards_corrupt_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORE_FILE), "not json").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.get(keys::TOKEN).is_none());
    }

    #[test]
    fn test_trait_object_usage() {
        let store: std::sync::Arc<dyn KeyValueStore> = std::sync::Arc::new(MemoryStore::new());
        store.set(keys::RELOAD_ATTEMPTED, "1");
        assert!(store.get(keys::RELOAD_ATTEMPTED).is_some());
    }
}
