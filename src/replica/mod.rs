//! User replication over the event bus.
//!
//! Outbound, registrations and password changes publish the full user row
//! keyed by operation kind. Inbound, events from peer services are applied
//! idempotently to the local store. Both directions share the
//! [`UserEventKind`] key contract.

pub mod consumer;
pub mod publisher;

/// Operation kind carried as the message key on the users topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEventKind {
    Created,
    Updated,
    Deleted,
}

impl UserEventKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Created => "POST.USER",
            Self::Updated => "PUT.USER",
            Self::Deleted => "DEL.USER",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "POST.USER" => Some(Self::Created),
            "PUT.USER" => Some(Self::Updated),
            "DEL.USER" => Some(Self::Deleted),
            _ => None,
        }
    }
}
