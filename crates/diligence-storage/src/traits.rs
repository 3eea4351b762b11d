//! Storage abstraction trait
//!
//! All storage backends implement this trait so the upload orchestrator can
//! work against any backend without coupling to implementation details.

use async_trait::async_trait;
use diligence_core::models::{StorageBackend, StorageLocator};
use thiserror::Error;

/// Storage operation errors.
///
/// `QuotaExceeded`, `NetworkFailure`, and `Rejected` are the transfer
/// failures a user can retry explicitly; the rest indicate caller or
/// configuration problems.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// **Key format:** keys are owner-scoped, `{owner_id}/{subcategory}/{name}`;
/// buckets map one-to-one to document categories. See the crate root
/// documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload an object and return its durable locator.
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<StorageLocator>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Publicly servable URL for an object at this bucket/key.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// The backend type.
    fn backend_type(&self) -> StorageBackend;
}
