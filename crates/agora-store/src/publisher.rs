//! `EventPublisher` implementations: Redis pub/sub and a log-only fallback.

use agora_core::error::DomainError;
use agora_core::publisher::{EventPublisher, PublishedEvent};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

/// Publishes events as JSON on Redis channels.
#[derive(Clone)]
pub struct RedisEventPublisher {
    connection: ConnectionManager,
}

impl RedisEventPublisher {
    /// Connects to the Redis server at `redis_url`. The connection manager
    /// reconnects on its own after transient failures.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, DomainError> {
        let client = redis::Client::open(redis_url).map_err(DomainError::storage)?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(DomainError::storage)?;
        Ok(Self { connection })
    }
}

impl std::fmt::Debug for RedisEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventPublisher").finish_non_exhaustive()
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, channel: &str, event: &PublishedEvent) -> Result<(), DomainError> {
        let payload = serde_json::to_string(event).map_err(DomainError::storage)?;
        let mut connection = self.connection.clone();
        let receivers: i64 = connection
            .publish(channel, payload)
            .await
            .map_err(DomainError::storage)?;
        debug!(%channel, event_type = %event.event_type, receivers, "published event");
        Ok(())
    }
}

/// Writes each event to the log instead of a transport. Used when no Redis
/// server is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, channel: &str, event: &PublishedEvent) -> Result<(), DomainError> {
        info!(%channel, event_type = %event.event_type, data = %event.data, "event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracing_publisher_accepts_every_event() {
        let event = PublishedEvent {
            event_type: "social.post_created".into(),
            data: serde_json::json!({ "payload": {} }),
        };

        let result = TracingEventPublisher.publish("social.post_created", &event).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_redis_publisher_rejects_malformed_url() {
        let result = RedisEventPublisher::connect("not a url").await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
    }
}
