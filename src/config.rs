//! Typed configuration from environment variables.
//!
//! Loads once at startup. Every variable has a sensible default, but a
//! present-and-malformed value fails fast rather than being ignored.
//!
//! In local dev, call `dotenvy::dotenv().ok()` before `from_env`.

use crate::engine::{DEFAULT_SWEEP_CAP, EngineConfig};
use crate::error::{Error, Result};
use crate::model::DEFAULT_THRESHOLD;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Default tracing filter (overridable by RUST_LOG).
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_path: std::env::var("LEADROTA_DB")
                .unwrap_or_else(|_| "leadrota.db".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            engine: EngineConfig {
                threshold: parsed_var("LEADROTA_THRESHOLD", DEFAULT_THRESHOLD)?,
                sweep_cap: parsed_var("LEADROTA_SWEEP_CAP", DEFAULT_SWEEP_CAP)?,
            },
        })
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}
