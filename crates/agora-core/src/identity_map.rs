//! Seen-set of aggregates tracked by a unit-of-work scope.
//!
//! Every aggregate returned by a repository `get`, `add` or `query` during a
//! scope is tracked here, in first-seen order, together with the write it
//! still owes the backing store. The map keeps the aggregates alive so a
//! unit of work can drain their outboxes after a handler returns.

use std::collections::HashMap;

use uuid::Uuid;

use crate::aggregate::AggregateRoot;

/// Persistence state of a tracked aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Loaded and unchanged since the last flush.
    Clean,
    /// Added during the scope; needs an insert.
    New,
    /// Changed during the scope; needs an update.
    Dirty,
    /// Deleted during the scope; needs a delete.
    Removed,
    /// Deleted and already flushed, or added and deleted before any flush.
    Gone,
}

impl TrackState {
    /// Returns `true` if the aggregate still exists from the scope's view.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Clean | Self::New | Self::Dirty)
    }
}

#[derive(Debug)]
struct Entry<A> {
    aggregate: A,
    state: TrackState,
}

/// Aggregates seen during one scope, keyed by identity.
#[derive(Debug)]
pub struct IdentityMap<A> {
    entries: Vec<Entry<A>>,
    index: HashMap<Uuid, usize>,
}

impl<A: AggregateRoot> IdentityMap<A> {
    /// Creates an empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of tracked aggregates, live or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an aggregate with `id` has been seen.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns the tracking state for `id`.
    #[must_use]
    pub fn state(&self, id: Uuid) -> Option<TrackState> {
        self.index.get(&id).map(|&i| self.entries[i].state)
    }

    /// Returns the tracked aggregate with `id`.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&A> {
        self.index.get(&id).map(|&i| &self.entries[i].aggregate)
    }

    /// Returns the tracked aggregate with `id` for mutation.
    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut A> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.entries[i].aggregate),
            None => None,
        }
    }

    /// Starts tracking `aggregate` and returns it. An aggregate with the same
    /// id that is already tracked is left untouched and returned instead.
    pub fn track(&mut self, aggregate: A, state: TrackState) -> &mut A {
        let id = aggregate.aggregate_id();
        let i = match self.index.get(&id) {
            Some(&i) => i,
            None => {
                self.entries.push(Entry { aggregate, state });
                let i = self.entries.len() - 1;
                self.index.insert(id, i);
                i
            }
        };
        &mut self.entries[i].aggregate
    }

    /// Records that the aggregate with `id` changed.
    pub fn mark_dirty(&mut self, id: Uuid) {
        if let Some(&i) = self.index.get(&id) {
            let entry = &mut self.entries[i];
            if entry.state == TrackState::Clean {
                entry.state = TrackState::Dirty;
            }
        }
    }

    /// Records that the aggregate with `id` was deleted.
    pub fn mark_removed(&mut self, id: Uuid) {
        if let Some(&i) = self.index.get(&id) {
            let entry = &mut self.entries[i];
            entry.state = match entry.state {
                TrackState::New | TrackState::Gone => TrackState::Gone,
                TrackState::Clean | TrackState::Dirty | TrackState::Removed => TrackState::Removed,
            };
        }
    }

    /// Writes owed to the backing store, in first-seen order.
    pub fn pending_writes(&self) -> impl Iterator<Item = (TrackState, &A)> {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, TrackState::New | TrackState::Dirty | TrackState::Removed))
            .map(|e| (e.state, &e.aggregate))
    }

    /// Marks every pending write as flushed.
    pub fn mark_persisted(&mut self) {
        for entry in &mut self.entries {
            entry.state = match entry.state {
                TrackState::New | TrackState::Dirty | TrackState::Clean => TrackState::Clean,
                TrackState::Removed | TrackState::Gone => TrackState::Gone,
            };
        }
    }

    /// Forgets every tracked aggregate.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<A: AggregateRoot> Default for IdentityMap<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Counter;

    #[test]
    fn test_track_keeps_existing_instance_for_same_id() {
        let mut map = IdentityMap::new();
        let mut counter = Counter::new();
        let id = counter.id;
        counter.bump();
        map.track(counter, TrackState::Clean);

        let duplicate = Counter::with_id(id);
        let tracked = map.track(duplicate, TrackState::New);

        assert_eq!(tracked.total, 1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.state(id), Some(TrackState::Clean));
    }

    #[test]
    fn test_pending_writes_follow_state_transitions() {
        // Arrange
        let mut map = IdentityMap::new();
        let loaded = Counter::new();
        let added = Counter::new();
        let doomed = Counter::new();
        let (loaded_id, added_id, doomed_id) = (loaded.id, added.id, doomed.id);
        map.track(loaded, TrackState::Clean);
        map.track(added, TrackState::New);
        map.track(doomed, TrackState::Clean);

        // Act
        map.mark_dirty(loaded_id);
        map.mark_dirty(added_id);
        map.mark_removed(doomed_id);

        // Assert
        let writes: Vec<(TrackState, Uuid)> = map
            .pending_writes()
            .map(|(state, a)| (state, a.id))
            .collect();
        assert_eq!(
            writes,
            vec![
                (TrackState::Dirty, loaded_id),
                (TrackState::New, added_id),
                (TrackState::Removed, doomed_id),
            ]
        );

        map.mark_persisted();
        assert_eq!(map.pending_writes().count(), 0);
        assert_eq!(map.state(doomed_id), Some(TrackState::Gone));
        assert_eq!(map.state(added_id), Some(TrackState::Clean));
    }

    #[test]
    fn test_removing_a_new_aggregate_needs_no_write() {
        let mut map = IdentityMap::new();
        let added = Counter::new();
        let id = added.id;
        map.track(added, TrackState::New);

        map.mark_removed(id);

        assert_eq!(map.state(id), Some(TrackState::Gone));
        assert_eq!(map.pending_writes().count(), 0);
    }
}
