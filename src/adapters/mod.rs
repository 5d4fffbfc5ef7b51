//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the realtime core to external systems:
//! - `websocket` - Live connections, event routing, client transport
//! - `push` - Subscription storage and Web Push delivery
//! - `http` - Push opt-in and health endpoints

pub mod http;
pub mod push;
pub mod websocket;

pub use push::{DeliveryBridge, InMemorySubscriptionStore, PostgresSubscriptionStore, WebPushSender};
pub use websocket::{EventRouter, InMemoryConnectionRegistry, TungsteniteConnector};
