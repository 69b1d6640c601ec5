//! Persistence of the last loaded documents
//!
//! The last successfully parsed map and security documents, and the names of
//! the files they came from, are kept in a key/value store under fixed keys.
//! Restoring never fails: a missing, unreadable or corrupt entry is logged
//! and treated as "nothing loaded".

use crate::config::PersistenceConfig;
use floorplan_model::{MapDocument, SecurityDocument};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Store keys.
pub mod keys {
    pub const MAP_DATA: &str = "mapData";
    pub const MAP_FILE_NAME: &str = "mapFileName";
    pub const SECURITY_DATA: &str = "securityData";
    pub const SECURITY_FILE_NAME: &str = "securityFileName";

    pub const ALL: [&str; 4] = [MAP_DATA, MAP_FILE_NAME, SECURITY_DATA, SECURITY_FILE_NAME];
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide string key/value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// STORES
// =============================================================================

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for_key(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for_key(key)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for_key(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash never leaves half an entry
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for_key(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Documents found in the store at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredSession {
    pub map: Option<MapDocument>,
    pub map_file_name: Option<String>,
    pub security: Option<SecurityDocument>,
    pub security_file_name: Option<String>,
}

impl RestoredSession {
    pub fn is_empty(&self) -> bool {
        self.map.is_none() && self.security.is_none()
    }
}

/// Typed access to the dashboard's entries in a [`KeyValueStore`].
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn from_config(config: &PersistenceConfig) -> Self {
        match &config.dir {
            Some(dir) => {
                info!(dir = %dir.display(), "persisting documents to disk");
                Self::new(FileStore::new(dir.clone()))
            }
            None => Self::in_memory(),
        }
    }

    pub fn save_map(&mut self, doc: &MapDocument, file_name: &str) -> Result<(), StoreError> {
        self.save(keys::MAP_DATA, doc, keys::MAP_FILE_NAME, file_name)
    }

    pub fn save_security(
        &mut self,
        doc: &SecurityDocument,
        file_name: &str,
    ) -> Result<(), StoreError> {
        self.save(keys::SECURITY_DATA, doc, keys::SECURITY_FILE_NAME, file_name)
    }

    fn save<T: Serialize>(
        &mut self,
        data_key: &str,
        doc: &T,
        name_key: &str,
        file_name: &str,
    ) -> Result<(), StoreError> {
        let text = serde_json::to_string(doc)?;
        self.store.set(data_key, &text)?;
        self.store.set(name_key, file_name)?;
        debug!(key = data_key, file = file_name, bytes = text.len(), "document persisted");
        Ok(())
    }

    /// Read back whatever is usable. A file name is only returned together
    /// with its document.
    pub fn restore(&self) -> RestoredSession {
        let map: Option<MapDocument> = self.restore_json(keys::MAP_DATA);
        let security: Option<SecurityDocument> = self.restore_json(keys::SECURITY_DATA);
        RestoredSession {
            map_file_name: map
                .as_ref()
                .and_then(|_| self.restore_text(keys::MAP_FILE_NAME)),
            security_file_name: security
                .as_ref()
                .and_then(|_| self.restore_text(keys::SECURITY_FILE_NAME)),
            map,
            security,
        }
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        for key in keys::ALL {
            self.store.remove(key)?;
        }
        Ok(())
    }

    /// Direct access to the backing store.
    pub fn raw_mut(&mut self) -> &mut dyn KeyValueStore {
        self.store.as_mut()
    }

    fn restore_text(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "stored entry unreadable, ignoring");
                None
            }
        }
    }

    fn restore_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = self.restore_text(key)?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "stored entry corrupt, ignoring");
                None
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floorplan_model::{Edge, Node};
    use pretty_assertions::assert_eq;

    fn map() -> MapDocument {
        MapDocument::new(
            20_000.0,
            10_000.0,
            vec![Node::new("A", 0.0, 0.0), Node::new("B", 5_000.0, 0.0)],
            vec![Edge::new("A", "B")],
            vec![],
        )
    }

    fn security() -> SecurityDocument {
        SecurityDocument::parse(
            r#"{"AvoidSceneSet":[{"id":1,"name":"Narrow","config":{"noload":{"forward":300}}}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn saved_documents_restore() {
        let mut store = SessionStore::in_memory();
        store.save_map(&map(), "site.json").unwrap();
        store.save_security(&security(), "avoid.json").unwrap();

        let restored = store.restore();
        assert_eq!(restored.map, Some(map()));
        assert_eq!(restored.map_file_name.as_deref(), Some("site.json"));
        assert_eq!(restored.security, Some(security()));
        assert_eq!(restored.security_file_name.as_deref(), Some("avoid.json"));
    }

    #[test]
    fn empty_store_restores_nothing() {
        let restored = SessionStore::in_memory().restore();
        assert!(restored.is_empty());
        assert_eq!(restored, RestoredSession::default());
    }

    #[test]
    fn corrupt_entry_fails_closed_per_entry() {
        let mut store = SessionStore::in_memory();
        store.save_security(&security(), "avoid.json").unwrap();
        store.raw_mut().set(keys::MAP_DATA, "{not json").unwrap();
        store.raw_mut().set(keys::MAP_FILE_NAME, "site.json").unwrap();

        let restored = store.restore();
        assert_eq!(restored.map, None);
        assert_eq!(restored.map_file_name, None);
        assert_eq!(restored.security, Some(security()));
    }

    #[test]
    fn clear_removes_every_key() {
        let mut store = SessionStore::in_memory();
        store.save_map(&map(), "site.json").unwrap();
        store.clear().unwrap();
        for key in keys::ALL {
            assert_eq!(store.raw_mut().get(key).unwrap(), None);
        }
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let mut store = FileStore::new(std::env::temp_dir());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
    }
}
