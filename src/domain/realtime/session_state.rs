//! Client session lifecycle.
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Authenticated
//!      ^              |          |           |
//!      +--------------+----------+-----------+   (close or error)
//! ```

use serde::Serialize;

use crate::domain::foundation::StateMachine;

/// Close code for an intentional, non-retriable disconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code the server sends when it shuts down. Clients reconnect.
pub const GOING_AWAY: u16 = 1001;

/// Whether a transport that closed with `code` should be reopened.
///
/// A missing code (transport error, abrupt EOF) counts as abnormal.
pub fn should_reconnect(code: Option<u16>) -> bool {
    code != Some(NORMAL_CLOSURE)
}

/// State of one client's realtime session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    /// The identity message has been sent on the current transport.
    Authenticated,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Open | SessionState::Authenticated)
    }
}

impl StateMachine for SessionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Open)
                | (Open, Authenticated)
                | (Connecting, Disconnected)
                | (Open, Disconnected)
                | (Authenticated, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionState::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Open, Disconnected],
            Open => vec![Authenticated, Disconnected],
            Authenticated => vec![Disconnected],
        }
    }
}
