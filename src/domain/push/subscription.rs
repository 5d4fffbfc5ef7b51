//! Push subscriptions - durable credentials for reaching a client that has
//! no live connection.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, TableId, Timestamp, UserId, ValidationError};
use crate::domain::realtime::StaffRole;

/// Encryption material the browser hands out with a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// Who a subscription belongs to, and how events reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subscriber {
    /// A staff member's device.
    Staff { user_id: UserId, role: StaffRole },
    /// An anonymous customer device seated at a table.
    Device { device_id: DeviceId, table_id: TableId },
}

impl Subscriber {
    /// Stable subscriber id (`user:<id>` or `device:<id>`).
    pub fn id(&self) -> String {
        match self {
            Subscriber::Staff { user_id, .. } => format!("user:{}", user_id),
            Subscriber::Device { device_id, .. } => format!("device:{}", device_id),
        }
    }
}

/// Identity that has no live connection and may be reached by push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    User(UserId),
    Table(TableId),
}

impl Recipient {
    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        match (self, subscriber) {
            (Recipient::User(wanted), Subscriber::Staff { user_id, .. }) => wanted == user_id,
            (Recipient::Table(wanted), Subscriber::Device { table_id, .. }) => wanted == table_id,
            _ => false,
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::User(user_id) => write!(f, "user:{}", user_id),
            Recipient::Table(table_id) => write!(f, "table:{}", table_id),
        }
    }
}

/// A stored push subscription.
///
/// At most one exists per `(subscriber id, endpoint)`; saving another with the
/// same pair replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub subscriber: Subscriber,
    pub endpoint: String,
    pub keys: PushKeys,
    pub created_at: Timestamp,
}

impl PushSubscription {
    /// Validates and creates a subscription stamped with the current time.
    pub fn new(
        subscriber: Subscriber,
        endpoint: impl Into<String>,
        keys: PushKeys,
    ) -> Result<Self, ValidationError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ValidationError::empty_field("endpoint"));
        }
        if !endpoint.starts_with("https://") {
            return Err(ValidationError::invalid_format(
                "endpoint",
                "push endpoints must use https",
            ));
        }
        if keys.p256dh.is_empty() {
            return Err(ValidationError::empty_field("keys.p256dh"));
        }
        if keys.auth.is_empty() {
            return Err(ValidationError::empty_field("keys.auth"));
        }

        Ok(Self {
            subscriber,
            endpoint,
            keys,
            created_at: Timestamp::now(),
        })
    }

    pub fn subscriber_id(&self) -> String {
        self.subscriber.id()
    }

    /// Whether `other` is the same stored record (same key and creation time).
    pub fn is_same_record(&self, other: &PushSubscription) -> bool {
        self.subscriber_id() == other.subscriber_id()
            && self.endpoint == other.endpoint
            && self.created_at == other.created_at
    }
}
