//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if a var is set to something unusable.

use std::time::Duration;

use crate::engine::QueueConfig;
use crate::error::{Error, Result};

/// Default dispatcher tick, in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub tick: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            tick: tick_var("EXPRESSLANE_TICK_MS")?,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Queue settings derived from this configuration.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig { tick: self.tick }
    }
}

fn tick_var(name: &str) -> Result<Duration> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(Duration::from_millis(DEFAULT_TICK_MS));
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(Error::Config(format!("{name} must be greater than zero"))),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(Error::Config(format!("{name}={raw:?} is not a valid tick: {e}"))),
    }
}
