//! Web push configuration
//!
//! Push delivery is the fallback path for identities with no live socket.
//! It is enabled only when both VAPID keys are set.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// VAPID credentials and delivery settings
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Application server public key (base64url, uncompressed P-256 point),
    /// handed to browsers when they subscribe.
    pub vapid_public_key: Option<String>,

    /// Matching private key (base64url).
    pub vapid_private_key: Option<SecretString>,

    /// Contact claim sent to push services.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// How long push services should hold an undelivered message, in seconds
    #[serde(default = "default_ttl")]
    pub ttl_secs: u32,

    /// Timeout for one push-service request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PushConfig {
    /// Both VAPID keys are configured.
    pub fn is_enabled(&self) -> bool {
        self.vapid_public_key.is_some() && self.vapid_private_key.is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate push configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let public_set = self
            .vapid_public_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        let private_set = self
            .vapid_private_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty());

        if public_set != private_set {
            return Err(ValidationError::IncompleteVapidKeys);
        }
        if !self.subject.starts_with("mailto:") && !self.subject.starts_with("https://") {
            return Err(ValidationError::InvalidVapidSubject);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            vapid_private_key: None,
            subject: default_subject(),
            ttl_secs: default_ttl(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_subject() -> String {
    "mailto:ops@taproom.local".to_string()
}

// Alerts older than this are stale: a waiter call from yesterday helps nobody.
fn default_ttl() -> u32 {
    3600
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let config = PushConfig::default();
        assert!(!config.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enabled_with_both_keys() {
        let config = PushConfig {
            vapid_public_key: Some("BPublic".to_string()),
            vapid_private_key: Some(SecretString::new("private".to_string())),
            ..Default::default()
        };
        assert!(config.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_half_configured_keys_fail() {
        let config = PushConfig {
            vapid_public_key: Some("BPublic".to_string()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::IncompleteVapidKeys));
    }

    #[test]
    fn test_subject_must_be_contact_url() {
        let config = PushConfig {
            subject: "ops@taproom.local".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidVapidSubject));
    }

    #[test]
    fn test_private_key_is_redacted_in_debug() {
        let config = PushConfig {
            vapid_private_key: Some(SecretString::new("super-secret".to_string())),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
