//! PushSender port - submits one notification to one push endpoint.

use async_trait::async_trait;

use crate::domain::push::{PushNotification, PushSubscription};

/// Outcome classes of a failed push submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Might succeed later (network, 429, 5xx). Not retried; the event is dropped.
    #[error("Transient push failure: {0}")]
    Transient(String),

    /// The subscription is gone (HTTP 404/410) and must be deleted.
    #[error("Push subscription no longer valid (HTTP {status})")]
    Terminal { status: u16 },
}

impl DeliveryError {
    /// Classify a push-service HTTP status that is not a success.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            404 | 410 => DeliveryError::Terminal { status },
            _ => DeliveryError::Transient(format!("HTTP {}: {}", status, body)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryError::Terminal { .. })
    }
}

/// Port for the external push-delivery protocol.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        notification: &PushNotification,
    ) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn PushSender) {}

    #[test]
    fn gone_and_not_found_are_terminal() {
        assert!(DeliveryError::from_status(410, "").is_terminal());
        assert!(DeliveryError::from_status(404, "").is_terminal());
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(!DeliveryError::from_status(429, "slow down").is_terminal());
        assert!(!DeliveryError::from_status(503, "").is_terminal());
        assert_eq!(
            DeliveryError::from_status(500, "oops").to_string(),
            "Transient push failure: HTTP 500: oops"
        );
    }
}
