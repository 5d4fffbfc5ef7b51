//! AlertDevice port - vibration and audio on the client device.
//!
//! Backs the mobile alert fallback, which must work without notification
//! permission. Every method may fail with `Unavailable` on devices that lack
//! the capability.

/// Errors raised by a device alert capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("Alert capability unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Alert playback failed: {0}")]
    Failed(String),
}

/// One tone of an alert sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Tone {
    pub const fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

/// Port for the device's vibration motor and speaker.
pub trait AlertDevice: Send + Sync {
    /// Vibrate with an on/off pattern in milliseconds.
    fn vibrate(&self, pattern: &[u32]) -> Result<(), AlertError>;

    /// Play tones back to back.
    fn play_tones(&self, tones: &[Tone]) -> Result<(), AlertError>;
}
