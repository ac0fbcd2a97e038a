//! Tracing subscriber installation
//!
//! The core and the SQLite adapter only emit `tracing` events; whoever embeds
//! CaseLedger decides where they go. [`init_tracing`] is the default wiring:
//! an `EnvFilter` (`RUST_LOG` wins over the configured level) feeding either
//! the human-readable or the JSON formatter on stderr.

use caseledger_domain::{CaseLedgerError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the event filter from `RUST_LOG`, falling back to `config.level`.
///
/// # Errors
/// Returns `CaseLedgerError::Config` if the configured directive is invalid.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|e| {
        CaseLedgerError::Config(format!("Invalid log level {:?}: {e}", config.level))
    })
}

/// Install the global subscriber.
///
/// Calling it again after a subscriber is installed is a no-op, so tests and
/// embedding applications can both call it safely.
///
/// # Errors
/// Returns `CaseLedgerError::Config` if the log level can't be parsed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).try_init()
    };

    match installed {
        Ok(()) => tracing::debug!(level = %config.level, json = config.json, "tracing initialised"),
        Err(_) => tracing::debug!("tracing subscriber already installed"),
    }
    Ok(())
}
