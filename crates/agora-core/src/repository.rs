//! Persistence gateway abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Flat, storable representation of an aggregate.
pub trait Record: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Filter accepted by `TableGateway::query` for this record kind.
    type Filter: Send + Sync + std::fmt::Debug;

    /// Returns the primary key of the record.
    fn record_id(&self) -> Uuid;
}

/// Backend operations for one record kind inside an open transaction.
///
/// Writes are only visible to other transactions after the owning
/// transaction commits.
#[async_trait]
pub trait TableGateway<R: Record>: Send {
    /// Load a record by primary key.
    async fn find(&mut self, id: Uuid) -> Result<Option<R>, DomainError>;

    /// Insert a new record.
    async fn insert(&mut self, record: &R) -> Result<(), DomainError>;

    /// Overwrite an existing record.
    async fn update(&mut self, record: &R) -> Result<(), DomainError>;

    /// Delete a record by primary key. Deleting a missing record is a no-op.
    async fn delete(&mut self, id: Uuid) -> Result<(), DomainError>;

    /// Return every record matching `filter`, in the filter's order.
    async fn query(&mut self, filter: &R::Filter) -> Result<Vec<R>, DomainError>;
}
