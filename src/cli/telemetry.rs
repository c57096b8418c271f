//! Tracing subscriber setup: pretty output for terminals, JSON for log
//! collectors.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Initialize logging.
///
/// The verbosity level drives the default filter directive; `RUST_LOG` can
/// still override individual targets.
///
/// # Errors
///
/// Returns an error if a filter directive fails to parse or a global
/// subscriber is already installed.
pub fn init(verbosity_level: Option<Level>, json: bool) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("rdkafka=warn".parse()?);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false);

    if json {
        let subscriber = Registry::default().with(fmt_layer.json()).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(fmt_layer.pretty()).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
