//! Server configuration.

use crate::error::{ServerError, ServerResult};
use tallysync_core::EntityKind;
use tallysync_sync_protocol::EnvelopeLimits;

/// Environment variable overriding [`ServerConfig::max_push_batch`].
pub const ENV_MAX_PUSH_BATCH: &str = "TALLYSYNC_MAX_PUSH_BATCH";

/// Environment variable overriding [`ServerConfig::pull_concurrency`].
pub const ENV_PULL_CONCURRENCY: &str = "TALLYSYNC_PULL_CONCURRENCY";

/// Message attached to `CONFLICT` results by default.
pub const DEFAULT_CONFLICT_MESSAGE: &str = "Server has newer data (server wins)";

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum operations in one push request.
    pub max_push_batch: usize,
    /// Maximum `deviceId` length.
    pub max_device_id_len: usize,
    /// Maximum per-kind queries running at once during a pull.
    pub pull_concurrency: usize,
    /// Message attached to `CONFLICT` results.
    pub conflict_message: String,
}

impl ServerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            max_push_batch: 500,
            max_device_id_len: 200,
            pull_concurrency: EntityKind::ALL.len(),
            conflict_message: DEFAULT_CONFLICT_MESSAGE.to_string(),
        }
    }

    /// Creates a configuration from the process environment.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let mut config = Self::new();
        if let Some(raw) = lookup(ENV_MAX_PUSH_BATCH) {
            config.max_push_batch = parse_positive(ENV_MAX_PUSH_BATCH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PULL_CONCURRENCY) {
            config.pull_concurrency = parse_positive(ENV_PULL_CONCURRENCY, &raw)?;
        }
        Ok(config)
    }

    /// Sets the maximum push batch size.
    pub fn with_max_push_batch(mut self, size: usize) -> Self {
        self.max_push_batch = size;
        self
    }

    /// Sets the maximum device id length.
    pub fn with_max_device_id_len(mut self, len: usize) -> Self {
        self.max_device_id_len = len;
        self
    }

    /// Sets the pull query concurrency.
    pub fn with_pull_concurrency(mut self, concurrency: usize) -> Self {
        self.pull_concurrency = concurrency.max(1);
        self
    }

    /// Sets the conflict message.
    pub fn with_conflict_message(mut self, message: impl Into<String>) -> Self {
        self.conflict_message = message.into();
        self
    }

    /// Returns the envelope limits derived from this configuration.
    pub fn envelope_limits(&self) -> EnvelopeLimits {
        EnvelopeLimits {
            max_batch: self.max_push_batch,
            max_device_id_len: self.max_device_id_len,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_positive(key: &str, raw: &str) -> ServerResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ServerError::InvalidConfig(format!(
            "{key} must be a positive integer, got `{raw}`"
        ))),
    }
}
