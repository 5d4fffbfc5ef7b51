//! Transport port - the server's write half of one client connection.
//!
//! The registry owns one `Transport` per live connection. Writes are
//! non-blocking and queued in order, so frames sent through the same
//! transport reach the client first-in, first-out.

use std::sync::Arc;

/// Errors raised by transport operations.
///
/// None of these are fatal to the process: a failed write is treated as an
/// implicit disconnect of that one connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection's writer is gone (socket closed or task ended).
    #[error("Transport closed")]
    Closed,

    /// Opening a transport failed.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Writing a frame failed.
    #[error("Write failed: {0}")]
    Write(String),
}

/// Write half of a connection, shared between the registry and the router.
pub trait Transport: Send + Sync {
    /// Queue a text frame. Frames are delivered in call order.
    fn send_text(&self, text: Arc<str>) -> Result<(), TransportError>;

    /// Queue a close frame with the given code. Later sends fail.
    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError>;
}
