//! Outbound user events.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Instrument};

use crate::replica::UserEventKind;
use crate::users::model::User;

/// Event publication abstraction, keyed by operation kind.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one payload under the given operation kind.
    async fn publish(&self, kind: UserEventKind, payload: Vec<u8>) -> Result<()>;
}

/// Standalone-mode publisher that logs instead of producing.
#[derive(Clone, Debug)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, kind: UserEventKind, payload: Vec<u8>) -> Result<()> {
        info!(
            key = kind.key(),
            bytes = payload.len(),
            "user event publish stub"
        );
        Ok(())
    }
}

/// Publishes user events to a Kafka topic.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    /// # Errors
    /// Returns an error if the producer cannot be created.
    pub fn new(brokers: &str, topic: String) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .context("failed to create kafka producer")?;

        Ok(Self { producer, topic })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, kind: UserEventKind, payload: Vec<u8>) -> Result<()> {
        let span = tracing::info_span!(
            "kafka.produce",
            messaging.system = "kafka",
            messaging.destination = self.topic.as_str(),
            messaging.kafka.key = kind.key()
        );

        let record = FutureRecord::to(&self.topic)
            .key(kind.key())
            .payload(&payload);

        self.producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .instrument(span)
            .await
            .map_err(|(err, _)| err)
            .context("failed to produce user event")?;

        Ok(())
    }
}

/// Serializes and publishes a user row without blocking the caller.
/// Publication is fire and forget, a failure is logged and the request
/// proceeds, downstream replicas catch up on the next event for that user.
pub fn publish_user(publisher: &Arc<dyn EventPublisher>, kind: UserEventKind, user: &User) {
    let payload = match serde_json::to_vec(user) {
        Ok(payload) => payload,
        Err(err) => {
            error!(key = kind.key(), "failed to encode user event: {err}");
            return;
        }
    };

    let publisher = Arc::clone(publisher);
    tokio::spawn(async move {
        if let Err(err) = publisher.publish(kind, payload).await {
            error!(key = kind.key(), "failed to publish user event: {err:#}");
        }
    });
}
