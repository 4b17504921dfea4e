//! Local key-value persistence.
//!
//! `KeyValueStore` mirrors the string-keyed, string-valued contract of browser
//! local storage. `ChatStorage` layers the client's three persisted keys on top
//! of any store.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::errors::{BookbotError, BookbotResult};
use crate::types::{ArchiveEntry, Theme, Turn};

pub const THEME_KEY: &str = "theme";
pub const CURRENT_CONVERSATION_KEY: &str = "currentConversation";
pub const ARCHIVE_KEY: &str = "chatHistory";

/// String key-value storage
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> BookbotResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> BookbotResult<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> BookbotResult<()>;
}

/// Stores each key in its own file inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> BookbotResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            BookbotError::StorageError(format!(
                "Failed to create storage directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized = key.replace(|c: char| !c.is_alphanumeric() && c != '-' && c != '_', "_");
        self.dir.join(format!("{}.json", sanitized))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> BookbotResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> BookbotResult<()> {
        let path = self.path_for(key);
        fs::write(&path, value)?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> BookbotResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory implementation of KeyValueStore
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> BookbotResult<Option<String>> {
        let values = self.values.read().map_err(|e| {
            BookbotError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> BookbotResult<()> {
        let mut values = self.values.write().map_err(|e| {
            BookbotError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> BookbotResult<()> {
        let mut values = self.values.write().map_err(|e| {
            BookbotError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        values.remove(key);
        Ok(())
    }
}

/// Persists the theme, the active conversation and the conversation archive
#[derive(Debug, Clone)]
pub struct ChatStorage {
    store: Arc<dyn KeyValueStore>,
}

impl ChatStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn load_theme(&self) -> Theme {
        match self.store.get(THEME_KEY) {
            Ok(Some(value)) => Theme::from_stored(value.trim()),
            Ok(None) => Theme::default(),
            Err(e) => {
                warn!("Failed to read theme preference: {}", e);
                Theme::default()
            }
        }
    }

    pub fn save_theme(&self, theme: Theme) -> BookbotResult<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    /// `None` when nothing usable is stored
    pub fn load_conversation(&self) -> BookbotResult<Option<Vec<Turn>>> {
        let Some(raw) = self.store.get(CURRENT_CONVERSATION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Turn>>(&raw) {
            Ok(turns) => Ok(Some(turns)),
            Err(e) => {
                warn!("Ignoring unreadable saved conversation: {}", e);
                Ok(None)
            }
        }
    }

    pub fn save_conversation(&self, turns: &[Turn]) -> BookbotResult<()> {
        let json = serde_json::to_string(turns)?;
        self.store.set(CURRENT_CONVERSATION_KEY, &json)
    }

    pub fn clear_conversation(&self) -> BookbotResult<()> {
        self.store.remove(CURRENT_CONVERSATION_KEY)
    }

    pub fn load_archive(&self) -> BookbotResult<Vec<ArchiveEntry>> {
        let Some(raw) = self.store.get(ARCHIVE_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Ignoring unreadable conversation archive: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn append_archive(&self, entry: ArchiveEntry) -> BookbotResult<()> {
        let mut entries = self.load_archive()?;
        entries.push(entry);
        let json = serde_json::to_string(&entries)?;
        self.store.set(ARCHIVE_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use tempfile::tempdir;

    fn turn(role: Role, content: &str, ordinal: u64) -> Turn {
        Turn {
            role,
            content: content.to_string(),
            ordinal,
            in_reply_to: None,
        }
    }

    #[test]
    fn test_file_store_get_set_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("storage")).unwrap();

        assert_eq!(store.get("theme").unwrap(), None);
        store.set("theme", "light").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));

        store.remove("theme").unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
        // Removing twice is fine
        store.remove("theme").unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("../escape", "x").unwrap();
        assert!(dir.path().join("___escape.json").exists());
        assert_eq!(store.get("../escape").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_theme_defaults_to_dark() {
        let storage = ChatStorage::in_memory();
        assert_eq!(storage.load_theme(), Theme::Dark);
        storage.save_theme(Theme::Light).unwrap();
        assert_eq!(storage.load_theme(), Theme::Light);
    }

    #[test]
    fn test_conversation_persistence() {
        let storage = ChatStorage::in_memory();
        assert_eq!(storage.load_conversation().unwrap(), None);

        let turns = vec![
            turn(Role::User, "hello", 0),
            turn(Role::Assistant, "hi there", 1),
        ];
        storage.save_conversation(&turns).unwrap();
        assert_eq!(storage.load_conversation().unwrap(), Some(turns));

        storage.clear_conversation().unwrap();
        assert_eq!(storage.load_conversation().unwrap(), None);
    }

    #[test]
    fn test_corrupt_conversation_is_treated_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(CURRENT_CONVERSATION_KEY, "{not json").unwrap();
        store.set(ARCHIVE_KEY, "[1, 2").unwrap();
        let storage = ChatStorage::new(store);
        assert_eq!(storage.load_conversation().unwrap(), None);
        assert!(storage.load_archive().unwrap().is_empty());
    }

    #[test]
    fn test_archive_appends_in_order() {
        let storage = ChatStorage::in_memory();
        for i in 0..3 {
            storage
                .append_archive(ArchiveEntry {
                    date: format!("2024-01-0{}T00:00:00Z", i + 1),
                    messages: vec![turn(Role::User, "q", 0)],
                })
                .unwrap();
        }
        let archive = storage.load_archive().unwrap();
        assert_eq!(archive.len(), 3);
        assert_eq!(archive[0].date, "2024-01-01T00:00:00Z");
        assert_eq!(archive[2].date, "2024-01-03T00:00:00Z");
    }
}
