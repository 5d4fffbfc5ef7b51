//! Realtime channel configuration
//!
//! Server-side heartbeat settings plus the defaults the client session
//! manager uses when reconnecting.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Heartbeat and reconnect timing, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Interval between server WebSocket pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,

    /// A connection that sends nothing (not even a pong) for this long is closed
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,

    /// Client delay before reconnecting after the socket closed
    #[serde(default = "default_reconnect_after_close")]
    pub reconnect_after_close_ms: u64,

    /// Client delay before retrying after a failed connect
    #[serde(default = "default_reconnect_after_failure")]
    pub reconnect_after_failure_ms: u64,

    /// Upper bound on the client's backoff delay
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Random jitter added to each client delay
    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
}

impl RealtimeConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ping_interval_ms == 0 {
            return Err(ValidationError::InvalidRealtimeSetting("ping_interval_ms"));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(ValidationError::InvalidRealtimeSetting(
                "idle_timeout_ms must exceed ping_interval_ms",
            ));
        }
        if self.max_backoff_ms < self.reconnect_after_close_ms
            || self.max_backoff_ms < self.reconnect_after_failure_ms
        {
            return Err(ValidationError::InvalidRealtimeSetting(
                "max_backoff_ms below a base reconnect delay",
            ));
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval(),
            idle_timeout_ms: default_idle_timeout(),
            reconnect_after_close_ms: default_reconnect_after_close(),
            reconnect_after_failure_ms: default_reconnect_after_failure(),
            max_backoff_ms: default_max_backoff(),
            jitter_ms: default_jitter(),
        }
    }
}

fn default_ping_interval() -> u64 {
    30_000
}

fn default_idle_timeout() -> u64 {
    90_000
}

fn default_reconnect_after_close() -> u64 {
    3_000
}

fn default_reconnect_after_failure() -> u64 {
    5_000
}

fn default_max_backoff() -> u64 {
    30_000
}

fn default_jitter() -> u64 {
    1_000
}
