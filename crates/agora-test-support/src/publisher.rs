//! Fake `EventPublisher` implementations for tests.

use std::sync::Mutex;

use agora_core::error::DomainError;
use agora_core::publisher::{EventPublisher, PublishedEvent};
use async_trait::async_trait;

/// A publisher that records every `(channel, event)` pair it is given.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, PublishedEvent)>>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything published so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<(String, PublishedEvent)> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the channels published to, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn channels(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(channel, _)| channel.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, channel: &str, event: &PublishedEvent) -> Result<(), DomainError> {
        self.published
            .lock()
            .unwrap()
            .push((channel.to_owned(), event.clone()));
        Ok(())
    }
}

/// A publisher whose transport is always down.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _channel: &str, _event: &PublishedEvent) -> Result<(), DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }
}
