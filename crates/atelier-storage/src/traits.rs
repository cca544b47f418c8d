//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must
//! implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Permanent errors (bad key, missing object, rejected credentials)
    /// must not be retried; everything else is treated as a transient
    /// transport failure.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            StorageError::NotFound(_)
                | StorageError::InvalidKey(_)
                | StorageError::PermissionDenied(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Keys are addressed directly; generation lives in the `keys` module so
/// backends never invent their own layout.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data under a specific storage key.
    async fn put(&self, storage_key: &str, data: Vec<u8>, content_type: &str)
        -> StorageResult<()>;

    /// Download an object by its storage key.
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object by its storage key. Deleting a missing object is a
    /// no-op, not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Delete a batch of objects. Individual failures are logged and
    /// skipped; returns the number of keys successfully deleted (missing
    /// objects count as deleted). Callers are expected to chunk very large
    /// key lists before calling.
    async fn delete_many(&self, storage_keys: &[String]) -> StorageResult<usize>;

    /// Check if an object exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type.
    fn backend_type(&self) -> StorageBackend;
}
