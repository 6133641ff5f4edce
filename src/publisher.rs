//! Fire-and-forget delivery of domain events.

use async_trait::async_trait;

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Delivery failures are logged, never returned: events are notifications, not part of the write.
    async fn publish(&self, event: &DomainEvent);
}

pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &DomainEvent) {
        tracing::debug!(subject = event.subject(), "event dropped, no broker configured");
    }
}

pub struct NatsPublisher { client: async_nats::Client }

impl NatsPublisher {
    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        tracing::info!(url, "connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &DomainEvent) {
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(subject = event.subject(), error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = self.client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %e, "failed to publish event");
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Captures published subjects for assertions.
    #[derive(Default)]
    pub struct RecordingPublisher { pub subjects: Mutex<Vec<&'static str>> }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: &DomainEvent) {
            self.subjects.lock().unwrap().push(event.subject());
        }
    }
}
