//! WebSocket adapters for the realtime channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 CRUD layer  ── publish(event) ──▶                   │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          EventRouter                                │
//! │   - Serializes the {type, data} envelope once                       │
//! │   - Fans out to live targets under the dispatch lock                │
//! │   - Hands offline identities to the DeliveryBridge                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   InMemoryConnectionRegistry                        │
//! │   conn-1 staff:waiter     conn-2 customer:7     conn-3 (anon)        │
//! │   topics {role:waiter}    topics {table:7}      topics {}            │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//!                 ChannelTransport ─▶ writer task ─▶ socket
//! ```
//!
//! # Components
//!
//! - [`messages`] - Wire protocol types
//! - [`registry`] - Live connections and their topics
//! - [`event_router`] - Event fan-out and push fallback
//! - [`transport`] - Per-connection FIFO queue
//! - [`handler`] - Axum WebSocket upgrade handler
//! - [`client_connector`] - Client-side transport for the session manager

pub mod client_connector;
pub mod event_router;
pub mod handler;
pub mod messages;
pub mod registry;
pub mod transport;

pub use client_connector::TungsteniteConnector;
pub use event_router::{EventRouter, RouteReport};
pub use handler::{
    handle_client_text, websocket_router, ws_handler, Heartbeat, WebSocketState,
    IDLE_TIMEOUT_CLOSE,
};
pub use messages::{ClientMessage, ControlMessage, ServerFrame};
pub use registry::InMemoryConnectionRegistry;
pub use transport::{ChannelTransport, OutboundFrame};
