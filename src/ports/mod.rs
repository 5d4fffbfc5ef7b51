//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the realtime core and the outside world. Adapters implement these ports.
//!
//! ## Server Ports
//!
//! - `EventPublisher` - `publish(event)`, called by the CRUD layer
//! - `ConnectionRegistry` - Live connections, identities and topics
//! - `Transport` - Write half of one live connection
//!
//! ## Push Ports
//!
//! - `SubscriptionStore` - Durable push subscriptions
//! - `PushSender` - External push-delivery protocol
//!
//! ## Client Ports
//!
//! - `ClientConnector` - Opens the client's transport
//! - `AlertDevice` - Vibration and audio for the alert fallback

mod alert_device;
mod client_connector;
mod connection_registry;
mod event_publisher;
mod push_sender;
mod subscription_store;
mod transport;

pub use alert_device::{AlertDevice, AlertError, Tone};
pub use client_connector::{ClientCommand, ClientConnection, ClientConnector, ClientFrame};
pub use connection_registry::{AuthError, ConnectionRegistry, LiveTarget, RegistryStats};
pub use event_publisher::EventPublisher;
pub use push_sender::{DeliveryError, PushSender};
pub use subscription_store::{SubscriptionStore, SubscriptionStoreError};
pub use transport::{Transport, TransportError};
