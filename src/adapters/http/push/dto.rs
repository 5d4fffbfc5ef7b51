//! HTTP DTOs for the push opt-in endpoints.
//!
//! Field names are camelCase to match the browser's `PushSubscription.toJSON()`
//! and the realtime wire protocol.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, TableId, UserId, ValidationError};
use crate::domain::push::{PushKeys, PushSubscription, Subscriber};
use crate::domain::realtime::StaffRole;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Who is opting in.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriberRequest {
    #[serde(rename_all = "camelCase")]
    Staff { user_id: i64, role: String },
    #[serde(rename_all = "camelCase")]
    Device { device_id: String, table_id: i64 },
}

impl TryFrom<SubscriberRequest> for Subscriber {
    type Error = ValidationError;

    fn try_from(request: SubscriberRequest) -> Result<Self, Self::Error> {
        match request {
            SubscriberRequest::Staff { user_id, role } => Ok(Subscriber::Staff {
                user_id: UserId::new(user_id)?,
                role: role.parse::<StaffRole>()?,
            }),
            SubscriberRequest::Device {
                device_id,
                table_id,
            } => Ok(Subscriber::Device {
                device_id: DeviceId::new(device_id)?,
                table_id: TableId::new(table_id)?,
            }),
        }
    }
}

/// Browser subscription as produced by `PushSubscription.toJSON()`.
///
/// `expirationTime` and any other extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

/// Request to store a push subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub subscriber: SubscriberRequest,
    pub subscription: BrowserSubscription,
}

/// Request to delete a push subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeRequest {
    pub subscriber: SubscriberRequest,
    pub endpoint: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Public VAPID key the browser passes to `pushManager.subscribe`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyResponse {
    pub public_key: String,
}

/// A stored subscription, without its keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscriber_id: String,
    pub endpoint: String,
    /// ISO 8601
    pub created_at: String,
}

impl From<PushSubscription> for SubscriptionResponse {
    fn from(subscription: PushSubscription) -> Self {
        Self {
            subscriber_id: subscription.subscriber_id(),
            created_at: subscription.created_at.to_rfc3339(),
            endpoint: subscription.endpoint,
        }
    }
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
