//! Blob storage port for uploaded images.

use async_trait::async_trait;

use crate::error::DomainError;

/// Object storage for binary payloads addressed by path.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` at `path`, replacing any existing object.
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), DomainError>;

    /// Return a URL through which the object at `path` can be fetched.
    async fn url(&self, path: &str) -> Result<String, DomainError>;
}
