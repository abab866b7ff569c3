//! Filesystem implementation of the `BlobStorage` port.

use std::path::{Component, Path, PathBuf};

use agora_core::blob_storage::BlobStorage;
use agora_core::error::DomainError;
use async_trait::async_trait;
use tracing::debug;

/// Stores blobs as files below a root directory and serves them from a
/// public base URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStorage {
    /// Creates a store writing below `root`. URLs are `public_url` followed
    /// by the blob path.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_owned(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(path);
        let plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(DomainError::Validation(format!(
                "blob path must be relative and plain: {path:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), DomainError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DomainError::storage)?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(DomainError::storage)?;
        debug!(%path, content_type, bytes = data.len(), "blob stored");
        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, DomainError> {
        self.resolve(path)?;
        Ok(format!("{}/{path}", self.public_url))
    }
}
