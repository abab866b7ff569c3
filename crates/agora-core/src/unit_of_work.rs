//! Unit-of-work contract consumed by the message bus.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::event::DomainEvent;

/// Transactional scope factory that also harvests the events recorded by
/// aggregates its scopes have seen.
///
/// A fresh unit of work is created for every `MessageBus::handle` call, so
/// harvested events never leak between independent calls.
pub trait UnitOfWork: Send + Sync + 'static {
    /// The event type harvested from aggregates.
    type Event: DomainEvent;

    /// Drains every event harvested since the last call, oldest first.
    /// Calling it again without new behavior returns an empty vector.
    fn collect_new_events(&self) -> Vec<Self::Event>;
}

/// FIFO buffer of harvested events shared between a unit of work and the
/// scopes it opens.
#[derive(Debug)]
pub struct CollectedEvents<E> {
    queue: Mutex<VecDeque<E>>,
}

impl<E> CollectedEvents<E> {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends events to the tail of the buffer.
    pub fn extend(&self, events: impl IntoIterator<Item = E>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(events);
    }

    /// Removes and returns every buffered event, oldest first.
    pub fn drain(&self) -> Vec<E> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Returns the number of buffered events.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for CollectedEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}
