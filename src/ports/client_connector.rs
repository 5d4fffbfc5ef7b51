//! ClientConnector port - how a client session opens its transport.
//!
//! A connection is exposed as a pair of channels so the session loop can
//! drive it from `tokio::select!` without knowing the wire library.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::TransportError;

/// Frame received from the server side of a client transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    /// The transport ended. `None` means no close frame was received.
    Closed { code: Option<u16> },
}

/// Frame the session asks the transport to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Text(String),
    Close { code: u16 },
}

/// An open client transport.
#[derive(Debug)]
pub struct ClientConnection {
    pub outbound: mpsc::UnboundedSender<ClientCommand>,
    pub inbound: mpsc::UnboundedReceiver<ClientFrame>,
}

/// Port for opening client transports.
#[async_trait]
pub trait ClientConnector: Send + Sync {
    /// Perform the transport handshake.
    async fn connect(&self) -> Result<ClientConnection, TransportError>;
}
