//! JSON file store backend
//!
//! Persists the whole key-value map as one pretty-printed JSON document,
//! by default at the platform config directory:
//! - Linux: `~/.config/shopdesk/state.json`
//! - macOS: `~/Library/Application Support/shopdesk/state.json`
//! - Windows: `%APPDATA%\shopdesk\state.json`
//!
//! Loading is fail-open: a missing or unparseable document starts empty
//! with a warning, never an error. Every write persists the full document
//! before watchers are notified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{ChangeListener, ChangeSignal, StoreAdapter, StoreError, WatchId};

/// Durable single-document store
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
    signal: ChangeSignal,
}

impl FileStore {
    /// Default state file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopdesk")
            .join("state.json")
    }

    /// Open the store at the default location.
    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Open the store at a specific path, loading any existing document.
    pub fn open(path: PathBuf) -> Self {
        let entries = Self::load_document(&path);
        Self {
            path,
            entries: RwLock::new(entries),
            signal: ChangeSignal::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_document(path: &Path) -> HashMap<String, String> {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(entries) => {
                    tracing::debug!("Loaded {} keys from {:?}", entries.len(), path);
                    entries
                }
                Err(e) => {
                    tracing::warn!("Failed to parse state document {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => {
                tracing::debug!("State document not found at {:?}, starting empty", path);
                HashMap::new()
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl StoreAdapter for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write();
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries)?;
        }
        self.signal.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = {
            let mut entries = self.entries.write();
            let removed = entries.remove(key).is_some();
            if removed {
                self.persist(&entries)?;
            }
            removed
        };
        if removed {
            self.signal.notify(key);
        }
        Ok(())
    }

    fn observe(&self, listener: ChangeListener) -> WatchId {
        self.signal.observe(listener)
    }

    fn unobserve(&self, id: WatchId) {
        self.signal.unobserve(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_reopen_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        let store = FileStore::open(path.clone());
        store.set("demoMode", "true").unwrap();
        store.set("language", "en").unwrap();

        let reopened = FileStore::open(path);
        assert_eq!(reopened.get("demoMode").as_deref(), Some("true"));
        assert_eq!(reopened.get("language").as_deref(), Some("en"));
    }

    #[test]
    fn test_remove_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        let store = FileStore::open(path.clone());
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();

        let reopened = FileStore::open(path);
        assert!(reopened.get("k").is_none());
    }

    #[test]
    fn test_corrupt_document_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let store = FileStore::open(path);
        assert!(store.get("anything").is_none());

        // Writing after a corrupt load replaces the document.
        store.set("fresh", "1").unwrap();
        assert_eq!(store.get("fresh").as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_parent_directories_are_created() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("deep").join("state.json");

        let store = FileStore::open(path.clone());
        store.set("k", "v").unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_watchers_fire_on_local_writes() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("state.json"));
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        store.observe(Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        store.set("a", "1").unwrap();
        store.remove("a").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
