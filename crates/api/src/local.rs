//! Persistent key/value storage for session data and offline mirrors

use crate::error::{ApiError, Result};
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// String key/value store that survives between runs of the client
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store. Nothing is persisted across restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// The file is read once on [`FileStore::open`] and rewritten after every
/// mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::storage(format!("{} is not a valid store: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("opened local store at {}", path.display());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("token").await.unwrap(), None);

        store.set("token", "abc".to_string()).await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), Some("abc".to_string()));

        store.remove("token").await.unwrap();
        store.remove("token").await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_between_opens() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("nested").join("session.json");

        let store = FileStore::open(&file_path).await.unwrap();
        store.set("token", "abc".to_string()).await.unwrap();
        store.set("user", r#"{"id":"u1"}"#.to_string()).await.unwrap();
        store.remove("user").await.unwrap();
        drop(store);

        let reopened = FileStore::open(&file_path).await.unwrap();
        assert_eq!(reopened.get("token").await.unwrap(), Some("abc".to_string()));
        assert_eq!(reopened.get("user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("session.json");
        tokio::fs::write(&file_path, "not json").await.unwrap();

        let result = FileStore::open(&file_path).await;
        assert!(matches!(result, Err(ApiError::Storage(_))));
    }
}
