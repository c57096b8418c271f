//! Command-line argument dispatch and server initialization.
//!
//! Parses validated CLI arguments and maps them to the appropriate action,
//! such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, mail, replication};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let mail_opts = mail::Options::parse(matches);
    let replication_opts = replication::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret: SecretString::from(auth_opts.session_secret),
        session_issuer: auth_opts.session_issuer,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        cookie_ttl_seconds: auth_opts.cookie_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        reset_url_base: auth_opts.reset_url_base,
        mail_url: mail_opts.url,
        kafka_brokers: replication_opts.brokers,
        kafka_topic: replication_opts.topic,
        kafka_group_id: replication_opts.group_id,
    }))
}
