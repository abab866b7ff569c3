//! Aggregate root abstraction.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::event::DomainEvent;
use crate::repository::Record;

/// Per-instance queue of events recorded by behavior methods and not yet
/// drained by a unit of work.
#[derive(Debug)]
pub struct Outbox<E> {
    events: VecDeque<E>,
}

impl<E> Outbox<E> {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Appends an event to the tail of the outbox.
    pub fn record(&mut self, event: E) {
        self.events.push_back(event);
    }

    /// Removes and returns the oldest pending event.
    pub fn pop(&mut self) -> Option<E> {
        self.events.pop_front()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E> Default for Outbox<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for aggregate roots that record domain events as a side effect of
/// their behavior methods.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate records.
    type Event: DomainEvent;

    /// The flat persistence representation of this aggregate.
    type Record: Record;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version. Starts at 1 and increases by one per
    /// persisted edit.
    fn version(&self) -> i64;

    /// Returns the pending event outbox.
    fn outbox(&self) -> &Outbox<Self::Event>;

    /// Returns the pending event outbox for draining.
    fn outbox_mut(&mut self) -> &mut Outbox<Self::Event>;

    /// Produces the persistence record for the current state.
    fn to_record(&self) -> Self::Record;

    /// Rebuilds an aggregate from a persisted record with an empty outbox.
    fn from_record(record: Self::Record) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_pops_in_recording_order() {
        // Arrange
        let mut outbox = Outbox::new();
        outbox.record("first");
        outbox.record("second");

        // Act
        let popped: Vec<_> = std::iter::from_fn(|| outbox.pop()).collect();

        // Assert
        assert_eq!(popped, vec!["first", "second"]);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_outboxes_are_independent_per_instance() {
        let mut a: Outbox<u32> = Outbox::default();
        let b: Outbox<u32> = Outbox::default();

        a.record(1);

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
