//! Shared application state.

use std::sync::Arc;

use agora_core::blob_storage::BlobStorage;
use agora_core::error::DomainError;
use agora_social::application::bootstrap::{SocialBus, SocialServices, bootstrap};
use agora_social::application::unit_of_work::SocialUnitOfWork;
use agora_social::domain::store::SocialStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The social message bus; commands go through here.
    pub bus: Arc<SocialBus>,
    /// Store read by query handlers.
    pub store: Arc<dyn SocialStore>,
    /// Resolves image URLs for views.
    pub blob_storage: Arc<dyn BlobStorage>,
    /// Which store backs the server, reported by `/health`.
    pub backend: &'static str,
}

impl AppState {
    /// Wires the bus over `services` and keeps the pieces queries need.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the handler registry is
    /// incomplete.
    pub fn new(services: SocialServices, backend: &'static str) -> Result<Self, DomainError> {
        let store = Arc::clone(&services.store);
        let blob_storage = Arc::clone(&services.blob_storage);
        let bus = bootstrap(services)?;
        Ok(Self {
            bus: Arc::new(bus),
            store,
            blob_storage,
            backend,
        })
    }

    /// A fresh unit of work for one read.
    #[must_use]
    pub fn reader(&self) -> SocialUnitOfWork {
        SocialUnitOfWork::new(Arc::clone(&self.store))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
