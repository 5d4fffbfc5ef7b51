//! Channel-backed transport for server-side WebSocket connections.
//!
//! Every accepted socket gets one unbounded queue. The router pushes frames
//! onto it without awaiting the network, and a single writer task per socket
//! drains it in order, which keeps per-connection delivery FIFO.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ports::{Transport, TransportError};

/// A frame queued for one socket's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(Arc<str>),
    Close { code: u16, reason: String },
}

/// [`Transport`] over an mpsc queue drained by the socket writer.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundFrame>,
    closed: AtomicBool,
}

impl ChannelTransport {
    /// Creates the transport and the receiver its writer task drains.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            tx,
            closed: AtomicBool::new(false),
        });
        (transport, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn send_text(&self, text: Arc<str>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.tx
            .send(OutboundFrame::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Closed);
        }
        self.tx
            .send(OutboundFrame::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| TransportError::Closed)
    }
}
