//! Storage port the social unit of work runs against.

use agora_core::error::DomainError;
use agora_core::repository::TableGateway;
use async_trait::async_trait;

use super::records::{CommentRecord, PostRecord};

/// One open backend transaction spanning the posts and comments tables.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait SocialTransaction: Send {
    /// Gateway to the posts table inside this transaction.
    fn posts(&mut self) -> &mut dyn TableGateway<PostRecord>;

    /// Gateway to the comments table inside this transaction.
    fn comments(&mut self) -> &mut dyn TableGateway<CommentRecord>;

    /// Make every write durable, all or nothing.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// A backing store for posts and comments.
#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Open a new transaction. No two transactions share a session.
    async fn begin(&self) -> Result<Box<dyn SocialTransaction>, DomainError>;
}
