//! Transactional unit of work for the social context.
//!
//! A [`SocialUnitOfWork`] lives for one bus call. Handlers open
//! [`UnitOfWorkScope`]s from it; each scope owns at most one backend
//! transaction at a time and an identity map per aggregate kind. Events
//! recorded by aggregates a scope has seen are forwarded to the unit of work
//! when the scope commits or is dropped, and the bus drains them from there.
//!
//! Dropping a scope that still holds a transaction rolls that transaction
//! back. An explicit [`UnitOfWorkScope::rollback`] also discards the
//! scope's undrained events.

use std::sync::Arc;

use agora_core::aggregate::AggregateRoot;
use agora_core::error::DomainError;
use agora_core::identity_map::{IdentityMap, TrackState};
use agora_core::repository::{Record, TableGateway};
use agora_core::unit_of_work::{CollectedEvents, UnitOfWork};
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::{Comment, Post};
use crate::domain::events::SocialEvent;
use crate::domain::store::{SocialStore, SocialTransaction};

/// Per-call unit of work over a [`SocialStore`].
pub struct SocialUnitOfWork {
    store: Arc<dyn SocialStore>,
    collected: CollectedEvents<SocialEvent>,
}

impl SocialUnitOfWork {
    /// Creates a unit of work with an empty event buffer.
    #[must_use]
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self {
            store,
            collected: CollectedEvents::new(),
        }
    }

    /// Opens a scope with fresh repositories and an empty seen-set. The
    /// backend transaction is opened on first use.
    #[must_use]
    pub fn begin(&self) -> UnitOfWorkScope<'_> {
        UnitOfWorkScope {
            uow: self,
            tx: None,
            posts: IdentityMap::new(),
            comments: IdentityMap::new(),
            seen: Vec::new(),
        }
    }
}

impl UnitOfWork for SocialUnitOfWork {
    type Event = SocialEvent;

    fn collect_new_events(&self) -> Vec<SocialEvent> {
        self.collected.drain()
    }
}

impl std::fmt::Debug for SocialUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialUnitOfWork")
            .field("collected", &self.collected.len())
            .finish_non_exhaustive()
    }
}

/// Which identity map an entry of the seen-set lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Post,
    Comment,
}

/// Aggregates a scope can hand out through a [`Repository`].
pub trait SocialAggregate: AggregateRoot<Event = SocialEvent> + Sized + 'static {
    /// Seen-set tag for this aggregate.
    const KIND: AggregateKind;

    /// This aggregate's table inside `tx`.
    fn table(tx: &mut dyn SocialTransaction) -> &mut dyn TableGateway<Self::Record>;
}

impl SocialAggregate for Post {
    const KIND: AggregateKind = AggregateKind::Post;

    fn table(tx: &mut dyn SocialTransaction) -> &mut dyn TableGateway<Self::Record> {
        tx.posts()
    }
}

impl SocialAggregate for Comment {
    const KIND: AggregateKind = AggregateKind::Comment;

    fn table(tx: &mut dyn SocialTransaction) -> &mut dyn TableGateway<Self::Record> {
        tx.comments()
    }
}

async fn open<'t>(
    slot: &'t mut Option<Box<dyn SocialTransaction>>,
    store: &dyn SocialStore,
) -> Result<&'t mut (dyn SocialTransaction + 'static), DomainError> {
    if slot.is_none() {
        *slot = Some(store.begin().await?);
    }
    slot.as_deref_mut()
        .ok_or_else(|| DomainError::Storage("transaction could not be opened".to_owned()))
}

async fn flush<A: AggregateRoot>(
    table: &mut dyn TableGateway<A::Record>,
    tracked: &IdentityMap<A>,
) -> Result<(), DomainError> {
    for (state, aggregate) in tracked.pending_writes() {
        match state {
            TrackState::New => table.insert(&aggregate.to_record()).await?,
            TrackState::Dirty => table.update(&aggregate.to_record()).await?,
            TrackState::Removed => table.delete(aggregate.aggregate_id()).await?,
            TrackState::Clean | TrackState::Gone => {}
        }
    }
    Ok(())
}

/// A transactional scope opened from a [`SocialUnitOfWork`].
pub struct UnitOfWorkScope<'u> {
    uow: &'u SocialUnitOfWork,
    tx: Option<Box<dyn SocialTransaction>>,
    posts: IdentityMap<Post>,
    comments: IdentityMap<Comment>,
    seen: Vec<(AggregateKind, Uuid)>,
}

impl UnitOfWorkScope<'_> {
    /// Repository for posts bound to this scope.
    pub fn posts(&mut self) -> Repository<'_, Post> {
        Repository {
            store: self.uow.store.as_ref(),
            tx: &mut self.tx,
            tracked: &mut self.posts,
            seen: &mut self.seen,
        }
    }

    /// Repository for comments bound to this scope.
    pub fn comments(&mut self) -> Repository<'_, Comment> {
        Repository {
            store: self.uow.store.as_ref(),
            tx: &mut self.tx,
            tracked: &mut self.comments,
            seen: &mut self.seen,
        }
    }

    /// Flushes every tracked write, posts before comments, and commits the
    /// transaction. The scope's events are then forwarded to the unit of
    /// work. The next repository call opens a new transaction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if a write or the commit fails. The
    /// transaction is rolled back and nothing becomes visible.
    pub async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = open(&mut self.tx, self.uow.store.as_ref()).await?;
        flush(tx.posts(), &self.posts).await?;
        flush(tx.comments(), &self.comments).await?;

        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        self.posts.mark_persisted();
        self.comments.mark_persisted();

        let uow = self.uow;
        uow.collected.extend(self.collect_new_events());
        debug!("unit of work scope committed");
        Ok(())
    }

    /// Rolls back the open transaction, if any, and forgets every aggregate
    /// seen in this scope together with its undrained events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the backend rollback fails.
    pub async fn rollback(&mut self) -> Result<(), DomainError> {
        let discarded = self.collect_new_events().count();
        self.posts.clear();
        self.comments.clear();
        self.seen.clear();
        debug!(discarded, "unit of work scope rolled back");

        match self.tx.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }

    /// Lazily pops every seen aggregate's outbox, in first-seen order and
    /// oldest event first. A second call without new behavior yields
    /// nothing.
    pub fn collect_new_events(&mut self) -> impl Iterator<Item = SocialEvent> + '_ {
        let Self {
            seen,
            posts,
            comments,
            ..
        } = self;
        let mut cursor = 0;
        std::iter::from_fn(move || {
            while let Some(&(kind, id)) = seen.get(cursor) {
                let next = match kind {
                    AggregateKind::Post => posts.get_mut(id).and_then(|p| p.outbox_mut().pop()),
                    AggregateKind::Comment => {
                        comments.get_mut(id).and_then(|c| c.outbox_mut().pop())
                    }
                };
                if next.is_some() {
                    return next;
                }
                cursor += 1;
            }
            None
        })
    }
}

impl Drop for UnitOfWorkScope<'_> {
    fn drop(&mut self) {
        let uow = self.uow;
        uow.collected.extend(self.collect_new_events());
        if self.tx.is_some() {
            debug!("unit of work scope dropped without commit; rolling back");
        }
    }
}

/// Repository handle for one aggregate kind, borrowed from a scope.
///
/// Methods consume the handle; ask the scope for a new one per call.
pub struct Repository<'s, A: SocialAggregate> {
    store: &'s dyn SocialStore,
    tx: &'s mut Option<Box<dyn SocialTransaction>>,
    tracked: &'s mut IdentityMap<A>,
    seen: &'s mut Vec<(AggregateKind, Uuid)>,
}

impl<'s, A: SocialAggregate> Repository<'s, A> {
    fn track(&mut self, aggregate: A, state: TrackState) {
        let id = aggregate.aggregate_id();
        if !self.tracked.contains(id) {
            self.seen.push((A::KIND, id));
        }
        self.tracked.track(aggregate, state);
    }

    async fn load(&mut self, id: Uuid) -> Result<(), DomainError> {
        if !self.tracked.contains(id) {
            let tx = open(self.tx, self.store).await?;
            let record = A::table(tx)
                .find(id)
                .await?
                .ok_or(DomainError::AggregateNotFound(id))?;
            self.track(A::from_record(record), TrackState::Clean);
        }
        if self.tracked.state(id).is_some_and(TrackState::is_live) {
            Ok(())
        } else {
            Err(DomainError::AggregateNotFound(id))
        }
    }

    /// Loads the aggregate with `id`, returning the scope's instance if it
    /// was already seen.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if it does not exist or was
    /// deleted in this scope, or `DomainError::Storage` on backend failure.
    pub async fn get(mut self, id: Uuid) -> Result<&'s mut A, DomainError> {
        self.load(id).await?;
        let Self { tracked, .. } = self;
        tracked
            .get_mut(id)
            .ok_or(DomainError::AggregateNotFound(id))
    }

    /// Starts tracking a new aggregate; it is inserted on commit. If an
    /// aggregate with the same id was already seen, that instance is kept.
    pub fn add(self, aggregate: A) -> &'s mut A {
        let Self { tracked, seen, .. } = self;
        let id = aggregate.aggregate_id();
        if !tracked.contains(id) {
            seen.push((A::KIND, id));
        }
        tracked.track(aggregate, TrackState::New)
    }

    /// Loads the aggregate with `id`, applies `change` to it and schedules
    /// an update on commit.
    ///
    /// # Errors
    ///
    /// Same as [`Repository::get`].
    pub async fn edit<R>(
        mut self,
        id: Uuid,
        change: impl FnOnce(&mut A) -> R + Send,
    ) -> Result<R, DomainError> {
        self.load(id).await?;
        self.tracked.mark_dirty(id);
        let aggregate = self
            .tracked
            .get_mut(id)
            .ok_or(DomainError::AggregateNotFound(id))?;
        Ok(change(aggregate))
    }

    /// Schedules the aggregate with `id` for deletion on commit. The
    /// instance stays in the seen-set so its events are still drained.
    ///
    /// # Errors
    ///
    /// Same as [`Repository::get`].
    pub async fn delete(mut self, id: Uuid) -> Result<(), DomainError> {
        self.load(id).await?;
        self.tracked.mark_removed(id);
        Ok(())
    }

    /// Returns the stored aggregates matching `filter`, in the filter's
    /// order. Aggregates already seen in this scope are returned as the
    /// scope's instance; ones deleted in this scope are left out.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` on backend failure.
    pub async fn query(
        mut self,
        filter: &<A::Record as Record>::Filter,
    ) -> Result<Vec<&'s A>, DomainError> {
        let tx = open(self.tx, self.store).await?;
        let records = A::table(tx).query(filter).await?;

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = record.record_id();
            if !self.tracked.contains(id) {
                self.track(A::from_record(record), TrackState::Clean);
            }
            ids.push(id);
        }

        let Self { tracked, .. } = self;
        let tracked: &'s IdentityMap<A> = tracked;
        Ok(ids
            .into_iter()
            .filter(move |id| tracked.state(*id).is_some_and(TrackState::is_live))
            .filter_map(move |id| tracked.get(id))
            .collect())
    }
}
