//! Local filesystem storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;

use super::backend::{StorageBackend, StorageError, StorageResult};

/// Local filesystem storage backend.
///
/// Objects live directly in `base_path` so the directory can be served as-is:
/// ```text
/// {base_path}/
///   {uuid}.{ext}
/// ```
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Create the base directory if needed
    pub async fn init(base_path: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self::new(base_path))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Get the full path for a key. Keys are single path components.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(|c| c == '/' || c == '\\' || c == '\0')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.base_path).await?;
        fs::write(&path, &data).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()), // Already deleted
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
