//! WebSocket message types for the realtime channel.
//!
//! Defines the protocol between the hub and connected clients:
//! - Server → Client: domain events (`{type, data}`) plus control frames
//!   (connected, auth/table confirmations, pong, errors)
//! - Client → Server: identity (`AUTH`, `JOIN_TABLE`), `CALL_WAITER`, `PING`

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TableId, Timestamp, UserId};
use crate::domain::realtime::{EventPayload, StaffRole};
use crate::ports::AuthError;

// ============================================
// Client → Server Messages
// ============================================

/// All message types a client may send.
///
/// Ids arrive as raw integers and are validated by the handler, so a bad id
/// is answered with an `ERROR` frame instead of being dropped as unparseable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Staff identity.
    #[serde(rename_all = "camelCase")]
    Auth { user_id: i64, role: String },

    /// Customer identity, bound to the table printed on the QR code.
    #[serde(rename_all = "camelCase")]
    JoinTable { table_id: i64 },

    /// Customer asks for a waiter. Defaults to the connection's own table.
    #[serde(rename_all = "camelCase")]
    CallWaiter {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<i64>,
    },

    /// Application-level heartbeat.
    Ping,
}

impl ClientMessage {
    pub fn auth(user_id: UserId, role: StaffRole) -> Self {
        ClientMessage::Auth {
            user_id: user_id.value(),
            role: role.as_str().to_string(),
        }
    }

    pub fn join_table(table_id: TableId) -> Self {
        ClientMessage::JoinTable {
            table_id: table_id.value(),
        }
    }

    pub fn call_waiter(table_id: Option<TableId>) -> Self {
        ClientMessage::CallWaiter {
            table_id: table_id.map(|t| t.value()),
        }
    }
}

// ============================================
// Server → Client Messages
// ============================================

/// Control frames the hub sends outside the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Sent once, right after the upgrade.
    #[serde(rename_all = "camelCase")]
    Connected {
        connection_id: String,
        timestamp: String,
    },

    /// Staff identity accepted.
    #[serde(rename_all = "camelCase")]
    AuthConfirmed { user_id: UserId, role: StaffRole },

    /// Customer identity accepted.
    #[serde(rename_all = "camelCase")]
    TableJoined { table_id: TableId },

    /// Heartbeat response.
    Pong { timestamp: String },

    /// A client message was rejected. The connection stays open.
    Error { code: String, message: String },
}

impl ControlMessage {
    pub fn connected(connection_id: impl ToString) -> Self {
        ControlMessage::Connected {
            connection_id: connection_id.to_string(),
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }

    pub fn pong() -> Self {
        ControlMessage::Pong {
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }

    pub fn error(code: impl ToString, message: impl Into<String>) -> Self {
        ControlMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn from_auth_error(err: &AuthError) -> Self {
        let code = match err {
            AuthError::AlreadyAuthenticated => "ALREADY_AUTHENTICATED",
            AuthError::UnknownConnection => "UNKNOWN_CONNECTION",
        };
        Self::error(code, err.to_string())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Anything a client can receive.
///
/// Events are tried first; their `type` values never collide with control
/// frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Event(EventPayload),
    Control(ControlMessage),
}

impl ServerFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
