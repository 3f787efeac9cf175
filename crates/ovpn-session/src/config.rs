//! Session controller configuration
//!
//! Defaults preserve the reconnection and polling policy of the
//! production deployment: five flat-delay retries, five-second stats
//! polling, ten-minute wake lock cap.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnection attempt cap per error cycle.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Flat delay before a reconnection attempt (not exponential).
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// Interval between traffic sample emissions while connected.
const DEFAULT_STATS_INTERVAL_MS: u64 = 5_000;

/// Wake lock acquisition timeout hint passed to the platform.
const DEFAULT_WAKE_LOCK_TIMEOUT_MS: u64 = 10 * 60 * 1_000;

/// Tunable session policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Reconnection attempts allowed per error cycle
    pub max_reconnect_attempts: u32,
    /// Flat delay before each reconnection attempt (ms)
    pub reconnect_delay_ms: u64,
    /// Traffic sample emission interval while connected (ms)
    pub stats_interval_ms: u64,
    /// Wake lock timeout hint (ms)
    pub wake_lock_timeout_ms: u64,
}

impl SessionConfig {
    /// Delay before a reconnection attempt.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Interval between traffic sample emissions.
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    /// Wake lock timeout hint.
    pub fn wake_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_lock_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_reconnect_attempts == 0 {
            return Err(ConfigError::NoReconnectAttempts);
        }
        if self.stats_interval_ms == 0 {
            return Err(ConfigError::ZeroStatsInterval);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
            wake_lock_timeout_ms: DEFAULT_WAKE_LOCK_TIMEOUT_MS,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("maxReconnectAttempts must be at least 1")]
    NoReconnectAttempts,

    #[error("statsIntervalMs must be nonzero")]
    ZeroStatsInterval,
}
