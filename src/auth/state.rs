//! Auth state and configuration.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::auth::token::{self, SessionClaims};
use crate::mail::Mailer;
use crate::replica::publisher::EventPublisher;

const DEFAULT_SESSION_ISSUER: &str = "custos";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_COOKIE_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_RESET_URL_BASE: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_secret: SecretString,
    session_issuer: String,
    session_ttl_seconds: i64,
    cookie_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    reset_url_base: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            session_issuer: DEFAULT_SESSION_ISSUER.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_ttl_seconds: DEFAULT_COOKIE_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            reset_url_base: DEFAULT_RESET_URL_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_issuer(mut self, issuer: String) -> Self {
        self.session_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_ttl_seconds(mut self, seconds: i64) -> Self {
        self.cookie_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_url_base(mut self, base: String) -> Self {
        self.reset_url_base = base;
        self
    }

    #[must_use]
    pub fn session_issuer(&self) -> &str {
        &self.session_issuer
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn cookie_ttl_seconds(&self) -> i64 {
        self.cookie_ttl_seconds
    }

    pub(crate) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(crate) fn reset_url_base(&self) -> &str {
        &self.reset_url_base
    }

    /// Session cookies are marked `Secure` when the reset links point at an
    /// https frontend.
    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.reset_url_base.starts_with("https://")
    }

    fn session_secret_bytes(&self) -> &[u8] {
        self.session_secret.expose_secret().as_bytes()
    }
}

pub struct AuthState {
    config: AuthConfig,
    mailer: Arc<dyn Mailer>,
    publisher: Arc<dyn EventPublisher>,
}

impl AuthState {
    pub fn new(config: AuthConfig, mailer: Arc<dyn Mailer>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            config,
            mailer,
            publisher,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub(crate) fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    /// Issue a session token for a freshly authenticated user.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue_session(&self, user_id: &str, role_id: &str) -> Result<String, token::Error> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            iss: self.config.session_issuer.clone(),
            sub: user_id.to_string(),
            role_id: role_id.to_string(),
            iat: now,
            exp: now + self.config.session_ttl_seconds,
        };

        token::sign_hs256(self.config.session_secret_bytes(), &claims)
    }

    /// Verify a session token against the configured secret and issuer.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, forged or expired.
    pub fn verify_session(&self, session_token: &str) -> Result<SessionClaims, token::Error> {
        token::verify_hs256(
            session_token,
            self.config.session_secret_bytes(),
            &self.config.session_issuer,
            Utc::now().timestamp(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::LogMailer;
    use crate::replica::publisher::LogPublisher;

    fn test_state() -> AuthState {
        let config = AuthConfig::new(SecretString::from("secret".to_string()));
        AuthState::new(config, Arc::new(LogMailer), Arc::new(LogPublisher))
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = AuthConfig::new(SecretString::from("secret".to_string()));

        assert_eq!(config.session_issuer(), DEFAULT_SESSION_ISSUER);
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(config.cookie_ttl_seconds(), DEFAULT_COOKIE_TTL_SECONDS);
        assert_eq!(
            config.reset_token_ttl_seconds(),
            DEFAULT_RESET_TOKEN_TTL_SECONDS
        );
        assert_eq!(config.reset_url_base(), DEFAULT_RESET_URL_BASE);
        assert!(!config.session_cookie_secure());

        let config = config
            .with_session_issuer("gatekeeper".to_string())
            .with_session_ttl_seconds(60)
            .with_cookie_ttl_seconds(120)
            .with_reset_token_ttl_seconds(300)
            .with_reset_url_base("https://app.example.com".to_string());

        assert_eq!(config.session_issuer(), "gatekeeper");
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.cookie_ttl_seconds(), 120);
        assert_eq!(config.reset_token_ttl_seconds(), 300);
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn test_issue_then_verify_session() {
        let state = test_state();
        let session_token = state.issue_session("user-1", "role-1").unwrap();
        let claims = state.verify_session(&session_token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role_id, "role-1");
        assert_eq!(claims.iss, "custos");
        assert_eq!(claims.exp - claims.iat, DEFAULT_SESSION_TTL_SECONDS);
    }

    #[test]
    fn test_verify_rejects_foreign_token() {
        let state = test_state();

        let other = AuthState::new(
            AuthConfig::new(SecretString::from("other-secret".to_string())),
            Arc::new(LogMailer),
            Arc::new(LogPublisher),
        );
        let session_token = other.issue_session("user-1", "role-1").unwrap();

        assert!(state.verify_session(&session_token).is_err());
    }
}
