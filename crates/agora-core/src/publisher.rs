//! Outbound pub/sub port.

use async_trait::async_trait;

use crate::error::DomainError;

/// A serialized event as handed to the pub/sub transport.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PublishedEvent {
    /// Event type name.
    pub event_type: String,
    /// Event metadata and payload.
    pub data: serde_json::Value,
}

/// Forwards domain events to an external pub/sub transport.
///
/// Delivery failures are the publishing handler's concern; the bus only
/// logs them.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `event` on `channel`.
    async fn publish(&self, channel: &str, event: &PublishedEvent) -> Result<(), DomainError>;
}

impl PublishedEvent {
    /// Builds the transport envelope for a domain event.
    pub fn from_event<E: crate::event::DomainEvent>(event: &E) -> Self {
        Self {
            event_type: event.event_type().to_owned(),
            data: serde_json::json!({
                "metadata": event.metadata(),
                "payload": event.to_payload(),
            }),
        }
    }
}
