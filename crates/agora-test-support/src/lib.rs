//! Shared test fakes and utilities for the Agora social backend.

mod blob_storage;
mod clock;
mod publisher;

pub use blob_storage::{FailingBlobStorage, InMemoryBlobStorage, StoredBlob};
pub use clock::{FixedClock, fixed_clock};
pub use publisher::{FailingPublisher, RecordingPublisher};
