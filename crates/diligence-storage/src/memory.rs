use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use diligence_core::models::{StorageBackend, StorageLocator};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// In-memory storage implementation
///
/// Backs tests and ephemeral deployments. Failures can be scripted per
/// operation: each queued failure is consumed by the next matching call,
/// which lets tests exercise transfer errors and best-effort cleanup paths.
pub struct MemoryStorage {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    put_failures: Mutex<VecDeque<StorageError>>,
    delete_failures: Mutex<VecDeque<StorageError>>,
    base_url: String,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            objects: Mutex::new(HashMap::new()),
            put_failures: Mutex::new(VecDeque::new()),
            delete_failures: Mutex::new(VecDeque::new()),
            base_url: "memory://".to_string(),
        }
    }

    /// Queue a failure for the next `put` call.
    pub fn push_put_failure(&self, error: StorageError) {
        self.put_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    /// Queue a failure for the next `delete` call.
    pub fn push_delete_failure(&self, error: StorageError) {
        self.delete_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    /// Number of stored objects, across all buckets.
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<StorageLocator> {
        if let Some(err) = self
            .put_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            tracing::debug!(bucket = %bucket, key = %key, "Memory storage put failing as scripted");
            return Err(err);
        }

        let size = data.len();
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((bucket.to_string(), key.to_string()), Bytes::from(data));

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            "Memory storage put successful"
        );

        Ok(StorageLocator {
            bucket: bucket.to_string(),
            key: key.to_string(),
            url: self.public_url(bucket, key),
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if let Some(err) = self
            .delete_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            tracing::debug!(bucket = %bucket, key = %key, "Memory storage delete failing as scripted");
            return Err(err);
        }

        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self
            .objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}{}/{}", self.base_url, bucket, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_exists() {
        let storage = MemoryStorage::new();
        let locator = storage
            .put("revenue-documents", "o/invoice/1-a.pdf", b"pdf".to_vec())
            .await
            .unwrap();

        assert_eq!(locator.url, "memory://revenue-documents/o/invoice/1-a.pdf");
        assert!(storage
            .exists("revenue-documents", "o/invoice/1-a.pdf")
            .await
            .unwrap());
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_put_failure_consumed_once() {
        let storage = MemoryStorage::new();
        storage.push_put_failure(StorageError::QuotaExceeded("bucket full".to_string()));

        let first = storage
            .put("revenue-documents", "k", b"x".to_vec())
            .await;
        assert!(matches!(first, Err(StorageError::QuotaExceeded(_))));
        assert_eq!(storage.object_count(), 0);

        let second = storage.put("revenue-documents", "k", b"x".to_vec()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_scripted_delete_failure_keeps_object() {
        let storage = MemoryStorage::new();
        storage
            .put("payroll-documents", "k", b"x".to_vec())
            .await
            .unwrap();
        storage.push_delete_failure(StorageError::NetworkFailure("timeout".to_string()));

        assert!(storage.delete("payroll-documents", "k").await.is_err());
        assert_eq!(storage.object_count(), 1);

        assert!(storage.delete("payroll-documents", "k").await.is_ok());
        assert_eq!(storage.object_count(), 0);
    }
}
