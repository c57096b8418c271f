//! Inbound user replication.
//!
//! The consumer loop applies events from peer services to the local store:
//! inserts as upserts, updates and deletes only when the row exists, so a
//! replayed or out-of-date event never crashes the loop. Malformed payloads
//! are logged and dropped, one poison message must not stall replication.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use sqlx::PgPool;
use tracing::{debug, error, info, warn, Instrument};

use crate::replica::UserEventKind;
use crate::users::model::User;
use crate::users::repo::UserRepo;

/// Kafka consumer settings for the users topic.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
}

/// Spawns the replication consumer loop.
///
/// Messages are handled one at a time, so events for the same user apply in
/// topic order.
///
/// # Errors
/// Returns an error if the consumer cannot be created or subscribed.
pub fn spawn_consumer(pool: PgPool, config: ConsumerConfig) -> Result<tokio::task::JoinHandle<()>> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", &config.group_id)
        .set("bootstrap.servers", &config.brokers)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .context("failed to create kafka consumer")?;

    consumer
        .subscribe(&[config.topic.as_str()])
        .context("failed to subscribe to users topic")?;

    info!(
        topic = %config.topic,
        group = %config.group_id,
        "replication consumer started"
    );

    Ok(tokio::spawn(async move {
        loop {
            match consumer.recv().await {
                Ok(message) => handle_message(&pool, &message).await,
                Err(err) => error!("kafka receive failed: {err}"),
            }
        }
    }))
}

async fn handle_message(pool: &PgPool, message: &BorrowedMessage<'_>) {
    let Some(kind) = message
        .key()
        .and_then(|key| std::str::from_utf8(key).ok())
        .and_then(UserEventKind::from_key)
    else {
        warn!("dropping event with unknown key");
        return;
    };

    let span = tracing::info_span!(
        "kafka.consume",
        messaging.system = "kafka",
        messaging.kafka.key = kind.key()
    );

    let payload = message.payload().unwrap_or_default();
    if let Err(err) = apply_event(pool, kind, payload).instrument(span).await {
        warn!(key = kind.key(), "dropping event: {err:#}");
    }
}

/// Applies a single decoded event to the local store.
pub(crate) async fn apply_event(pool: &PgPool, kind: UserEventKind, payload: &[u8]) -> Result<()> {
    match kind {
        UserEventKind::Created => {
            let user = decode_user(payload)?;
            UserRepo::upsert(pool, &user).await?;
            debug!(id = %user.id, "replicated user insert");
        }
        UserEventKind::Updated => {
            let user = decode_user(payload)?;
            if UserRepo::update(pool, &user).await? {
                debug!(id = %user.id, "replicated user update");
            } else {
                debug!(id = %user.id, "skipping update for unknown user");
            }
        }
        UserEventKind::Deleted => {
            let id = decode_user_id(payload)?;
            if UserRepo::delete(pool, &id).await? {
                debug!(id = %id, "replicated user delete");
            } else {
                debug!(id = %id, "skipping delete for unknown user");
            }
        }
    }

    Ok(())
}

fn decode_user(payload: &[u8]) -> Result<User> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).context("event payload is not json")?;

    Ok(User {
        id: required_str(&value, "id")?,
        name: required_str(&value, "name")?,
        username: required_str(&value, "username")?,
        email: required_str(&value, "email")?,
        password: required_str(&value, "password")?,
        phone: optional_str(&value, "phone"),
        role_id: required_str(&value, "role_id")?,
        role_name: None,
        created_at: required_timestamp(&value, "created_at")?,
        updated_at: required_timestamp(&value, "updated_at")?,
    })
}

fn decode_user_id(payload: &[u8]) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).context("event payload is not json")?;

    required_str(&value, "id")
}

fn required_str(value: &serde_json::Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .with_context(|| format!("event payload missing field: {field}"))
}

/// Absent, null and empty string all mean "no phone".
fn optional_str(value: &serde_json::Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn required_timestamp(value: &serde_json::Value, field: &str) -> Result<DateTime<Utc>> {
    let raw = value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .with_context(|| format!("event payload missing field: {field}"))?;

    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("event payload field {field} is not rfc3339"))?;

    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db::TestDb;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "id": "3f6c2a9e-1d54-4f6b-9c1e-8a2b5d7e0f13",
            "name": "Jane Doe",
            "username": "jane",
            "email": "jane@example.com",
            "password": "$argon2id$v=19$m=19456,t=2,p=1$abc$def",
            "phone": "6281234567890",
            "role_id": "role-1",
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-01-16T09:30:00+07:00",
        })
    }

    #[test]
    fn test_decode_user_reads_every_field() {
        let payload = serde_json::to_vec(&sample_payload()).unwrap();
        let user = decode_user(&payload).unwrap();

        assert_eq!(user.id, "3f6c2a9e-1d54-4f6b-9c1e-8a2b5d7e0f13");
        assert_eq!(user.username, "jane");
        assert_eq!(user.phone.as_deref(), Some("6281234567890"));
        assert_eq!(user.role_id, "role-1");
        assert!(user.role_name.is_none());
        assert_eq!(user.created_at.to_rfc3339(), "2024-01-15T10:00:00+00:00");
        // offsets normalize to UTC
        assert_eq!(user.updated_at.to_rfc3339(), "2024-01-16T02:30:00+00:00");
    }

    #[test]
    fn test_decode_user_treats_empty_phone_as_absent() {
        for phone in [json!(null), json!("")] {
            let mut payload = sample_payload();
            payload["phone"] = phone;
            let user = decode_user(&serde_json::to_vec(&payload).unwrap()).unwrap();
            assert!(user.phone.is_none());
        }

        let mut payload = sample_payload();
        payload.as_object_mut().unwrap().remove("phone");
        let user = decode_user(&serde_json::to_vec(&payload).unwrap()).unwrap();
        assert!(user.phone.is_none());
    }

    #[test]
    fn test_decode_user_rejects_missing_fields() {
        for field in ["id", "name", "username", "email", "password", "role_id"] {
            let mut payload = sample_payload();
            payload.as_object_mut().unwrap().remove(field);
            let result = decode_user(&serde_json::to_vec(&payload).unwrap());
            assert!(result.is_err(), "expected error for missing {field}");
        }
    }

    #[test]
    fn test_decode_user_rejects_mistyped_fields() {
        let mut payload = sample_payload();
        payload["name"] = json!(42);
        assert!(decode_user(&serde_json::to_vec(&payload).unwrap()).is_err());

        let mut payload = sample_payload();
        payload["created_at"] = json!("yesterday");
        assert!(decode_user(&serde_json::to_vec(&payload).unwrap()).is_err());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(decode_user(b"not json").is_err());
        assert!(decode_user_id(b"").is_err());
    }

    #[test]
    fn test_decode_user_id_only_needs_id() {
        let payload = serde_json::to_vec(&json!({"id": "user-9"})).unwrap();
        assert_eq!(decode_user_id(&payload).unwrap(), "user-9");
    }

    #[tokio::test]
    async fn test_replayed_events_apply_idempotently() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };

        let id = "3f6c2a9e-1d54-4f6b-9c1e-8a2b5d7e0f13";
        let payload = serde_json::to_vec(&sample_payload())?;

        apply_event(&db.pool, UserEventKind::Created, &payload).await?;
        apply_event(&db.pool, UserEventKind::Created, &payload).await?;

        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&db.pool)
            .await?;
        assert_eq!(rows, 1);

        let tombstone = serde_json::to_vec(&json!({ "id": id }))?;
        apply_event(&db.pool, UserEventKind::Deleted, &tombstone).await?;
        apply_event(&db.pool, UserEventKind::Deleted, &tombstone).await?;

        // an update arriving after the delete is a skip, not an error
        apply_event(&db.pool, UserEventKind::Updated, &payload).await?;

        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&db.pool)
            .await?;
        assert_eq!(rows, 0);

        Ok(())
    }
}
