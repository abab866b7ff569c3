//! Fake `BlobStorage` implementations for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use agora_core::blob_storage::BlobStorage;
use agora_core::error::DomainError;
use async_trait::async_trait;

/// An object stored by `InMemoryBlobStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Raw bytes.
    pub data: Vec<u8>,
    /// MIME type given at upload.
    pub content_type: String,
}

/// A blob store that keeps objects in memory, keyed by path.
#[derive(Debug, Default)]
pub struct InMemoryBlobStorage {
    objects: Mutex<BTreeMap<String, StoredBlob>>,
}

impl InMemoryBlobStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object stored at `path`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    /// Returns every stored path, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), DomainError> {
        self.objects.lock().unwrap().insert(
            path.to_owned(),
            StoredBlob {
                data: data.to_vec(),
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, DomainError> {
        Ok(format!("memory://{path}"))
    }
}

/// A blob store whose backend is always unreachable.
#[derive(Debug)]
pub struct FailingBlobStorage;

#[async_trait]
impl BlobStorage for FailingBlobStorage {
    async fn put(&self, _path: &str, _data: &[u8], _content_type: &str) -> Result<(), DomainError> {
        Err(DomainError::Storage("bucket unreachable".into()))
    }

    async fn url(&self, _path: &str) -> Result<String, DomainError> {
        Err(DomainError::Storage("bucket unreachable".into()))
    }
}
