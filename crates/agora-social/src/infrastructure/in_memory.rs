//! In-memory `SocialStore` for development and tests.
//!
//! Each transaction works on a private snapshot of the tables and logs its
//! writes. Commit replays the log against the current shared tables and
//! swaps the result in only if every write applies. Updates replay the
//! record's columns but only the likes the transaction itself added or
//! removed, so likes committed concurrently by others survive.

use std::sync::{Arc, Mutex, PoisonError};

use agora_core::error::DomainError;
use agora_core::repository::TableGateway;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::Like;
use crate::domain::records::{CommentFilter, CommentRecord, PostFilter, PostRecord};
use crate::domain::store::{SocialStore, SocialTransaction};

#[derive(Debug, Clone, Default)]
struct Tables {
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
}

/// Likes a transaction added to or removed from one row.
#[derive(Debug, Clone, Default)]
struct LikeDelta {
    added: Vec<Like>,
    removed: Vec<String>,
}

impl LikeDelta {
    fn between(before: &[Like], after: &[Like]) -> Self {
        let has = |likes: &[Like], user_id: &str| likes.iter().any(|l| l.user_id == user_id);
        Self {
            added: after
                .iter()
                .filter(|l| !has(before, &l.user_id))
                .cloned()
                .collect(),
            removed: before
                .iter()
                .filter(|l| !has(after, &l.user_id))
                .map(|l| l.user_id.clone())
                .collect(),
        }
    }

    fn apply_to(&self, likes: &mut Vec<Like>) {
        likes.retain(|l| !self.removed.contains(&l.user_id));
        for like in &self.added {
            if !likes.iter().any(|l| l.user_id == like.user_id) {
                likes.push(like.clone());
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Write {
    InsertPost(PostRecord),
    UpdatePost(PostRecord, LikeDelta),
    DeletePost(Uuid),
    InsertComment(CommentRecord),
    UpdateComment(CommentRecord, LikeDelta),
    DeleteComment(Uuid),
}

fn duplicate(id: Uuid) -> DomainError {
    DomainError::Storage(format!("duplicate key {id}"))
}

impl Tables {
    fn apply(&mut self, write: &Write) -> Result<(), DomainError> {
        match write {
            Write::InsertPost(record) => {
                if self.posts.iter().any(|p| p.id == record.id) {
                    return Err(duplicate(record.id));
                }
                self.posts.push(record.clone());
            }
            Write::UpdatePost(record, delta) => {
                if let Some(existing) = self.posts.iter_mut().find(|p| p.id == record.id) {
                    let mut likes = std::mem::take(&mut existing.likes);
                    delta.apply_to(&mut likes);
                    *existing = PostRecord {
                        likes,
                        ..record.clone()
                    };
                }
            }
            Write::DeletePost(id) => {
                self.posts.retain(|p| p.id != *id);
                self.comments.retain(|c| c.post_id != *id);
            }
            Write::InsertComment(record) => {
                if self.comments.iter().any(|c| c.id == record.id) {
                    return Err(duplicate(record.id));
                }
                if !self.posts.iter().any(|p| p.id == record.post_id) {
                    return Err(DomainError::Storage(format!(
                        "comment {} references missing post {}",
                        record.id, record.post_id
                    )));
                }
                self.comments.push(record.clone());
            }
            Write::UpdateComment(record, delta) => {
                if let Some(existing) = self.comments.iter_mut().find(|c| c.id == record.id) {
                    let mut likes = std::mem::take(&mut existing.likes);
                    delta.apply_to(&mut likes);
                    *existing = CommentRecord {
                        likes,
                        ..record.clone()
                    };
                }
            }
            Write::DeleteComment(id) => self.delete_thread(*id),
        }
        Ok(())
    }

    /// Removes a comment and every reply beneath it.
    fn delete_thread(&mut self, root: Uuid) {
        let mut doomed = vec![root];
        let mut cursor = 0;
        while let Some(&parent) = doomed.get(cursor) {
            doomed.extend(
                self.comments
                    .iter()
                    .filter(|c| c.parent_id == Some(parent))
                    .map(|c| c.id),
            );
            cursor += 1;
        }
        self.comments.retain(|c| !doomed.contains(&c.id));
    }
}

/// A `SocialStore` held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemorySocialStore {
    tables: Arc<Mutex<Tables>>,
    fail_commits: bool,
}

impl InMemorySocialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose commits always fail, leaving the tables
    /// untouched.
    #[must_use]
    pub fn failing_commits() -> Self {
        Self {
            fail_commits: true,
            ..Self::default()
        }
    }

    /// Committed posts, in insertion order.
    pub fn posts(&self) -> Vec<PostRecord> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .posts
            .clone()
    }

    /// Committed comments, in insertion order.
    pub fn comments(&self) -> Vec<CommentRecord> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .comments
            .clone()
    }
}

#[async_trait]
impl SocialStore for InMemorySocialStore {
    async fn begin(&self) -> Result<Box<dyn SocialTransaction>, DomainError> {
        let snapshot = self
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.tables),
            working: snapshot,
            log: Vec::new(),
            fail_commit: self.fail_commits,
        }))
    }
}

struct InMemoryTransaction {
    shared: Arc<Mutex<Tables>>,
    working: Tables,
    log: Vec<Write>,
    fail_commit: bool,
}

impl InMemoryTransaction {
    fn write(&mut self, write: Write) -> Result<(), DomainError> {
        self.working.apply(&write)?;
        self.log.push(write);
        Ok(())
    }
}

#[async_trait]
impl TableGateway<PostRecord> for InMemoryTransaction {
    async fn find(&mut self, id: Uuid) -> Result<Option<PostRecord>, DomainError> {
        Ok(self.working.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&mut self, record: &PostRecord) -> Result<(), DomainError> {
        self.write(Write::InsertPost(record.clone()))
    }

    async fn update(&mut self, record: &PostRecord) -> Result<(), DomainError> {
        let before = self.working.posts.iter().find(|p| p.id == record.id);
        let before = before.map_or(&[][..], |p| p.likes.as_slice());
        let delta = LikeDelta::between(before, &record.likes);
        self.write(Write::UpdatePost(record.clone(), delta))
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DomainError> {
        self.write(Write::DeletePost(id))
    }

    async fn query(&mut self, filter: &PostFilter) -> Result<Vec<PostRecord>, DomainError> {
        let mut matching: Vec<PostRecord> = self
            .working
            .posts
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| filter.order.compare(a, b));

        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = filter
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl TableGateway<CommentRecord> for InMemoryTransaction {
    async fn find(&mut self, id: Uuid) -> Result<Option<CommentRecord>, DomainError> {
        Ok(self.working.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&mut self, record: &CommentRecord) -> Result<(), DomainError> {
        self.write(Write::InsertComment(record.clone()))
    }

    async fn update(&mut self, record: &CommentRecord) -> Result<(), DomainError> {
        let before = self.working.comments.iter().find(|c| c.id == record.id);
        let before = before.map_or(&[][..], |c| c.likes.as_slice());
        let delta = LikeDelta::between(before, &record.likes);
        self.write(Write::UpdateComment(record.clone(), delta))
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DomainError> {
        self.write(Write::DeleteComment(id))
    }

    async fn query(&mut self, filter: &CommentFilter) -> Result<Vec<CommentRecord>, DomainError> {
        let mut matching: Vec<CommentRecord> = self
            .working
            .comments
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);
        Ok(matching)
    }
}

#[async_trait]
impl SocialTransaction for InMemoryTransaction {
    fn posts(&mut self) -> &mut dyn TableGateway<PostRecord> {
        self
    }

    fn comments(&mut self) -> &mut dyn TableGateway<CommentRecord> {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        if self.fail_commit {
            return Err(DomainError::Storage("commit refused".to_owned()));
        }

        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = shared.clone();
        for write in &self.log {
            next.apply(write)?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}
