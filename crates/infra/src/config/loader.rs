//! Configuration loader
//!
//! Loads application configuration from a file, then applies environment
//! overrides on top.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory if one exists
//! 2. Reads the file named by `CASELEDGER_CONFIG`, or the first file found by
//!    [`probe_config_paths`], or falls back to built-in defaults
//! 3. Applies `CASELEDGER_*` environment variables over the result
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CASELEDGER_CONFIG`: Explicit config file path
//! - `CASELEDGER_DB_PATH`: Database file path
//! - `CASELEDGER_DB_POOL_SIZE`: Connection pool size
//! - `CASELEDGER_DB_BUSY_TIMEOUT_MS`: SQLite busy timeout in milliseconds
//! - `CASELEDGER_DB_CONNECTION_TIMEOUT_SECS`: Pool checkout timeout in seconds
//! - `CASELEDGER_LOG_LEVEL`: `EnvFilter` directive (e.g. `info`, `caseledger_core=debug`)
//! - `CASELEDGER_LOG_JSON`: Emit JSON log lines (true/false)
//! - `CASELEDGER_REQUIRE_DELETE_REASON`: Require a reason for permanent deletion (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./caseledger.json` or `./caseledger.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use caseledger_domain::{CaseLedgerError, Config, Result};

const CONFIG_PATH_VAR: &str = "CASELEDGER_CONFIG";

/// Load configuration with file discovery and environment overrides
///
/// # Errors
/// Returns `CaseLedgerError::Config` if:
/// - `CASELEDGER_CONFIG` names a file that doesn't exist
/// - A config file is found but its format is invalid
/// - An environment override can't be parsed
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => return Err(CaseLedgerError::Config(format!("Invalid .env file: {e}"))),
    }

    let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
    let mut config = match explicit.or_else(probe_config_paths) {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::info!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from environment variables only
///
/// Unset variables keep their defaults. See module documentation for the
/// complete list.
///
/// # Errors
/// Returns `CaseLedgerError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension). Fields
/// missing from the file keep their defaults.
///
/// # Errors
/// Returns `CaseLedgerError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CaseLedgerError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CaseLedgerError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CaseLedgerError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CaseLedgerError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CaseLedgerError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CaseLedgerError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, and the executable's
/// directory. Returns the first config file found, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(config_candidates(&cwd));
        candidates.push(cwd.join("../config.json"));
        candidates.push(cwd.join("../config.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(config_candidates(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn config_candidates(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("caseledger.json"),
        dir.join("caseledger.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
    ]
}

/// Apply every `CASELEDGER_*` override that is set
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(path) = env_string("CASELEDGER_DB_PATH") {
        config.database.path = path;
    }
    if let Some(size) = env_parse::<u32>("CASELEDGER_DB_POOL_SIZE", "pool size")? {
        config.database.pool_size = size;
    }
    if let Some(ms) = env_parse::<u64>("CASELEDGER_DB_BUSY_TIMEOUT_MS", "busy timeout")? {
        config.database.busy_timeout_ms = ms;
    }
    if let Some(secs) =
        env_parse::<u64>("CASELEDGER_DB_CONNECTION_TIMEOUT_SECS", "connection timeout")?
    {
        config.database.connection_timeout_secs = secs;
    }
    if let Some(level) = env_string("CASELEDGER_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("CASELEDGER_LOG_JSON", config.logging.json);
    config.archive.require_delete_reason =
        env_bool("CASELEDGER_REQUIRE_DELETE_REASON", config.archive.require_delete_reason);

    Ok(())
}

/// Non-blank environment variable, trimmed
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a numeric environment variable if it is set
///
/// # Errors
/// Returns `CaseLedgerError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| CaseLedgerError::Config(format!("Invalid {what} in {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
