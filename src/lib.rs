//! # Custos (Credential Lifecycle Service)
//!
//! `custos` is a small authentication authority. It owns the user credential
//! store and covers the full credential lifecycle: registration, login,
//! session issuance, logout and password reset.
//!
//! ## Identifiers
//!
//! Users are addressable by three unique identifiers: username, email and
//! phone. Login accepts a single identifier field and resolves it with a
//! strict precedence (username, then email, then phone) so that a miss on an
//! earlier identifier never widens into a match on a later one.
//!
//! ## Sessions
//!
//! Sessions are stateless `HS256` tokens delivered through an `HttpOnly`
//! cookie. Logout clears the cookie; no server-side session state is kept.
//!
//! ## Password Reset
//!
//! Reset tokens are single-use, per-email and superseded on reissue: at most
//! one live token exists for an email at any time. Tokens travel
//! base64-encoded in reset links and expire after a configurable TTL.
//!
//! ## Replication
//!
//! When Kafka is configured, user creations and updates are published as
//! full-row events and events from peer services are applied idempotently to
//! the local store.

pub mod api;
pub mod auth;
pub mod cli;
pub mod mail;
pub mod replica;
pub mod users;

#[cfg(test)]
mod test_db;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
