//! Reconnect delays for the client session.
//!
//! Capped exponential backoff with additive jitter. The base delay depends
//! on how the previous attempt ended, and the exponent resets once a
//! transport opens.

use std::time::Duration;

use rand::Rng;

use crate::config::RealtimeConfig;

/// How the previous transport attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// An open transport closed abnormally.
    Closed,
    /// The handshake itself failed.
    ConnectFailed,
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    after_close: Duration,
    after_failure: Duration,
    max_delay: Duration,
    jitter: Duration,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(
        after_close: Duration,
        after_failure: Duration,
        max_delay: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            after_close,
            after_failure,
            max_delay,
            jitter,
            attempt: 0,
        }
    }

    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reconnect_after_close_ms),
            Duration::from_millis(config.reconnect_after_failure_ms),
            Duration::from_millis(config.max_backoff_ms),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Reconnects scheduled since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for the next attempt before jitter.
    pub fn base_delay(&self, cause: Disconnect) -> Duration {
        let base = match cause {
            Disconnect::Closed => self.after_close,
            Disconnect::ConnectFailed => self.after_failure,
        };
        let factor = 1u32.checked_shl(self.attempt.min(16)).unwrap_or(u32::MAX);
        base.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay for the next attempt, then advance the exponent.
    pub fn next_delay(&mut self, cause: Disconnect) -> Duration {
        let delay = self.base_delay(cause) + self.sample_jitter();
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Call once a transport opens.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}
