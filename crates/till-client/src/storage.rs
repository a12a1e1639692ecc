//! # Durable Client Storage
//!
//! A tiny string key-value store that survives restarts.
//!
//! ## Key Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storage Keys                                     │
//! │                                                                         │
//! │   key       writer            contents                                  │
//! │   ───       ──────            ────────                                  │
//! │   "token"   SessionManager    raw bearer token                          │
//! │   "cart"    CartManager       JSON array of line items                  │
//! │                                                                         │
//! │   Each key has exactly one writer. Nothing else is persisted.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Storage key owned by the session manager.
pub const TOKEN_KEY: &str = "token";

/// Storage key owned by the cart manager.
pub const CART_KEY: &str = "cart";

/// Synchronous string storage.
///
/// Writes are small and local, so the trait is deliberately not async;
/// cart mutations persist inline.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> ClientResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> ClientResult<()>;
}

// =============================================================================
// File Store
// =============================================================================

/// One file per key inside a directory.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a crash never leaves a half-written value behind.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> ClientResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ClientError::Storage(format!("{}: {}", dir.display(), e)))?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> ClientResult<PathBuf> {
        let valid = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if key.is_empty() || !key.chars().all(valid) {
            return Err(ClientError::Storage(format!("invalid key: {:?}", key)));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{}.tmp", key));

        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store. Nothing survives the process; useful for tests and
/// one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ClientResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();

        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        store.put(TOKEN_KEY, "T1").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T1"));

        store.put(TOKEN_KEY, "T2").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T2"));

        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store.remove(TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::open(dir.path()).unwrap().put(CART_KEY, "[]").unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(CART_KEY).unwrap().as_deref(), Some("[]"));
        assert!(!dir.path().join(".cart.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.put("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.put(CART_KEY, "[]").unwrap();
        assert_eq!(store.get(CART_KEY).unwrap().as_deref(), Some("[]"));
        store.remove(CART_KEY).unwrap();
        assert_eq!(store.get(CART_KEY).unwrap(), None);
    }
}
