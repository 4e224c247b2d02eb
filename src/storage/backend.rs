//! Storage backend trait definition.
//!
//! Uploaded item photos are stored as flat objects keyed by a generated file
//! name and served back to clients under [`PUBLIC_PREFIX`].

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::error::ServerError;

/// URL prefix under which stored uploads are served
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for ServerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidKey(key) => ServerError::Validation(format!("Invalid file name: {}", key)),
            other => ServerError::Storage(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend trait for pluggable upload storage.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store an object under `key`, replacing any previous content
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Generate a unique storage key that keeps the upload's extension
pub fn upload_key(original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    let id = uuid::Uuid::new_v4();
    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Public URL path for a stored key
pub fn public_path(key: &str) -> String {
    format!("{}/{}", PUBLIC_PREFIX, key)
}

/// Storage key for a public URL path, if the path points into the upload area
pub fn key_from_public_path(path: &str) -> Option<&str> {
    path.strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
}
