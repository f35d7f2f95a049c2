//! Bot client configuration parameters
//!
//! All tunable parameters for the polling session and upload path.
//! The bot token is deliberately not part of this struct: configuration may
//! be logged or persisted, the token must not be.

use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Default API host.
pub const DEFAULT_HOST: &str = "api.telegram.org";

/// Default HTTPS port.
pub const DEFAULT_PORT: u16 = 443;

/// Core client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    // --- Endpoint ---
    /// API host name, sent in the `Host` header and used for connect.
    pub host: String,
    /// API port.
    pub port: u16,

    // --- Timing ---
    /// Minimum time between two poll requests (milliseconds)
    pub min_update_interval_ms: u32,
    /// Multiple of the poll interval without any activity after which the
    /// connection is presumed dead
    pub stale_factor: u32,
    /// How long a blocking request waits for the response (milliseconds)
    pub reply_timeout_ms: u32,
    /// How long an upload waits for the success marker (milliseconds)
    pub upload_timeout_ms: u32,

    // --- Buffers ---
    /// Upload block size (bytes written between cooperative yields)
    pub block_size: usize,
    /// Maximum response body kept in memory (bytes)
    pub rx_buffer_size: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,

            min_update_interval_ms: 2000,
            stale_factor: 10,
            reply_timeout_ms: 3000,
            upload_timeout_ms: 20_000,

            block_size: 1024,
            rx_buffer_size: 8192,
        }
    }
}

impl BotConfig {
    /// Reject values that would make the session misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(BotError::Config("host must not be empty"));
        }
        if self.min_update_interval_ms == 0 {
            return Err(BotError::Config("min_update_interval_ms must be > 0"));
        }
        if self.stale_factor < 2 {
            return Err(BotError::Config("stale_factor must be >= 2"));
        }
        if self.reply_timeout_ms == 0 || self.upload_timeout_ms == 0 {
            return Err(BotError::Config("timeouts must be > 0"));
        }
        if self.block_size == 0 {
            return Err(BotError::Config("block_size must be > 0"));
        }
        if self.rx_buffer_size < 256 {
            return Err(BotError::Config("rx_buffer_size must be >= 256"));
        }
        Ok(())
    }

    /// Staleness window in milliseconds.
    pub fn stale_after_ms(&self) -> u64 {
        u64::from(self.min_update_interval_ms) * u64::from(self.stale_factor)
    }
}
