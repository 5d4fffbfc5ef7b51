//! Vibration and audio alerts for events received in the foreground.
//!
//! Works without notification permission. Device failures are logged and
//! swallowed; an alert never interrupts event handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::realtime::EventType;
use crate::ports::{AlertDevice, Tone};

/// Vibration pattern and tone sequence for one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPattern {
    /// On/off durations in milliseconds.
    pub vibration: &'static [u32],
    pub tones: &'static [Tone],
}

const NEW_ORDER: AlertPattern = AlertPattern {
    vibration: &[200, 100, 200],
    tones: &[Tone::new(880, 150), Tone::new(1175, 200)],
};

const WAITER_CALLED: AlertPattern = AlertPattern {
    vibration: &[400, 150, 400, 150, 400],
    tones: &[Tone::new(988, 180), Tone::new(740, 180), Tone::new(988, 180), Tone::new(740, 300)],
};

const ORDER_UPDATED: AlertPattern = AlertPattern {
    vibration: &[120],
    tones: &[Tone::new(660, 120)],
};

impl AlertPattern {
    /// Pattern for `event_type`, or `None` for events that stay silent.
    pub fn for_event(event_type: EventType) -> Option<AlertPattern> {
        match event_type {
            EventType::NewOrder => Some(NEW_ORDER),
            EventType::WaiterCalled => Some(WAITER_CALLED),
            EventType::OrderUpdated => Some(ORDER_UPDATED),
            EventType::TableUpdated => None,
        }
    }
}

/// What an alert actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertOutcome {
    pub vibrated: bool,
    pub sounded: bool,
}

pub struct AlertFallback {
    device: Arc<dyn AlertDevice>,
    foreground: AtomicBool,
}

impl AlertFallback {
    /// Starts in the foreground.
    pub fn new(device: Arc<dyn AlertDevice>) -> Self {
        Self {
            device,
            foreground: AtomicBool::new(true),
        }
    }

    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::Relaxed);
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::Relaxed)
    }

    /// Alert for a received event. Does nothing in the background.
    pub fn on_event(&self, event_type: EventType) -> AlertOutcome {
        if !self.is_foreground() {
            return AlertOutcome::default();
        }
        let Some(pattern) = AlertPattern::for_event(event_type) else {
            return AlertOutcome::default();
        };

        let vibrated = match self.device.vibrate(pattern.vibration) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(event_type = %event_type, error = %e, "Vibration skipped");
                false
            }
        };
        let sounded = match self.device.play_tones(pattern.tones) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(event_type = %event_type, error = %e, "Alert tone skipped");
                false
            }
        };

        AlertOutcome { vibrated, sounded }
    }
}
