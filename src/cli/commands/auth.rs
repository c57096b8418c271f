use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_ISSUER: &str = "session-issuer";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_TTL_SECONDS: &str = "cookie-ttl-seconds";
pub const ARG_RESET_TOKEN_TTL_SECONDS: &str = "reset-token-ttl-seconds";
pub const ARG_RESET_URL_BASE: &str = "reset-url-base";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign session tokens")
                .env("CUSTOS_SESSION_SECRET"),
        )
        .arg(
            Arg::new(ARG_SESSION_ISSUER)
                .long(ARG_SESSION_ISSUER)
                .help("Issuer claim stamped into session tokens")
                .env("CUSTOS_SESSION_ISSUER")
                .default_value("custos"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("CUSTOS_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_TTL_SECONDS)
                .long(ARG_COOKIE_TTL_SECONDS)
                .help("Session cookie Max-Age in seconds")
                .env("CUSTOS_COOKIE_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_SECONDS)
                .long(ARG_RESET_TOKEN_TTL_SECONDS)
                .help("Password reset token TTL in seconds")
                .env("CUSTOS_RESET_TOKEN_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_URL_BASE)
                .long(ARG_RESET_URL_BASE)
                .help("Base URL for password reset links sent by email")
                .env("CUSTOS_RESET_URL_BASE")
                .default_value("http://localhost:3000"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub session_secret: String,
    pub session_issuer: Option<String>,
    pub session_ttl_seconds: i64,
    pub cookie_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub reset_url_base: Option<String>,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let session_secret = matches.get_one::<String>(ARG_SESSION_SECRET).cloned();
        let session_secret = match session_secret {
            Some(value) if !value.trim().is_empty() => value,
            _ => anyhow::bail!("missing required argument: --{ARG_SESSION_SECRET}"),
        };

        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            session_secret,
            session_issuer: get_non_empty(ARG_SESSION_ISSUER),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
            cookie_ttl_seconds: matches
                .get_one::<i64>(ARG_COOKIE_TTL_SECONDS)
                .copied()
                .unwrap_or(86_400),
            reset_token_ttl_seconds: matches
                .get_one::<i64>(ARG_RESET_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(1800),
            reset_url_base: get_non_empty(ARG_RESET_URL_BASE),
        })
    }
}
