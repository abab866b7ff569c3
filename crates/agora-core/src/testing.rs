//! Minimal aggregate, messages and unit of work used by this crate's tests.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::aggregate::{AggregateRoot, Outbox};
use crate::command::Command;
use crate::event::{DomainEvent, EventMetadata};
use crate::message::{MessageKind, Routable};
use crate::repository::Record;
use crate::unit_of_work::{CollectedEvents, UnitOfWork};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestEventKind {
    Bumped,
    Chained,
    Ignored,
}

impl MessageKind for TestEventKind {
    fn all() -> &'static [Self] {
        &[Self::Bumped, Self::Chained, Self::Ignored]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bumped => "test.bumped",
            Self::Chained => "test.chained",
            Self::Ignored => "test.ignored",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestEvent {
    pub kind: TestEventKind,
    pub aggregate_id: Uuid,
    pub value: u32,
    pub metadata: EventMetadata,
}

impl TestEvent {
    pub fn new(kind: TestEventKind, value: u32) -> Self {
        let aggregate_id = Uuid::new_v4();
        Self {
            kind,
            aggregate_id,
            value,
            metadata: EventMetadata::new(
                kind.name(),
                aggregate_id,
                Uuid::nil(),
                Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            ),
        }
    }
}

impl Routable for TestEvent {
    type Kind = TestEventKind;

    fn kind(&self) -> TestEventKind {
        self.kind
    }
}

impl DomainEvent for TestEvent {
    fn event_type(&self) -> &'static str {
        self.kind.name()
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "value": self.value })
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCommandKind {
    Bump,
    Explode,
}

impl MessageKind for TestCommandKind {
    fn all() -> &'static [Self] {
        &[Self::Bump, Self::Explode]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bump => "test.bump",
            Self::Explode => "test.explode",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TestCommand {
    /// Emits one `Bumped` event per listed value.
    Bump(Vec<u32>),
    /// Emits a `Bumped` event and then fails.
    Explode,
}

impl Routable for TestCommand {
    type Kind = TestCommandKind;

    fn kind(&self) -> TestCommandKind {
        match self {
            Self::Bump(_) => TestCommandKind::Bump,
            Self::Explode => TestCommandKind::Explode,
        }
    }
}

impl Command for TestCommand {
    fn command_type(&self) -> &'static str {
        self.kind().name()
    }

    fn correlation_id(&self) -> Uuid {
        Uuid::nil()
    }
}

/// Unit of work whose handlers emit events directly and note what ran in a
/// journal shared across calls.
#[derive(Debug, Default)]
pub struct RecordingUnitOfWork {
    pub collected: CollectedEvents<TestEvent>,
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl RecordingUnitOfWork {
    pub fn with_journal(journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            collected: CollectedEvents::new(),
            journal,
        }
    }

    pub fn note(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    pub fn emit(&self, event: TestEvent) {
        self.collected.extend([event]);
    }
}

impl UnitOfWork for RecordingUnitOfWork {
    type Event = TestEvent;

    fn collect_new_events(&self) -> Vec<TestEvent> {
        self.collected.drain()
    }
}

#[derive(Debug, Clone)]
pub struct CounterRecord {
    pub id: Uuid,
    pub total: u32,
}

impl Record for CounterRecord {
    type Filter = ();

    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Aggregate that records one `Bumped` event per bump.
#[derive(Debug)]
pub struct Counter {
    pub id: Uuid,
    pub total: u32,
    outbox: Outbox<TestEvent>,
}

impl Counter {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            total: 0,
            outbox: Outbox::new(),
        }
    }

    pub fn bump(&mut self) {
        self.total += 1;
        let mut event = TestEvent::new(TestEventKind::Bumped, self.total);
        event.aggregate_id = self.id;
        self.outbox.record(event);
    }
}

impl AggregateRoot for Counter {
    type Event = TestEvent;
    type Record = CounterRecord;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        i64::from(self.total) + 1
    }

    fn outbox(&self) -> &Outbox<TestEvent> {
        &self.outbox
    }

    fn outbox_mut(&mut self) -> &mut Outbox<TestEvent> {
        &mut self.outbox
    }

    fn to_record(&self) -> CounterRecord {
        CounterRecord {
            id: self.id,
            total: self.total,
        }
    }

    fn from_record(record: CounterRecord) -> Self {
        Self {
            id: record.id,
            total: record.total,
            outbox: Outbox::new(),
        }
    }
}
