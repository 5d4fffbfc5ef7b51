//! Push adapters - subscription storage and Web Push delivery.
//!
//! - [`InMemorySubscriptionStore`] / [`PostgresSubscriptionStore`] - `SubscriptionStore`
//! - [`WebPushSender`] - `PushSender` over VAPID + reqwest
//! - [`DeliveryBridge`] - Push fallback used by the event router

mod delivery_bridge;
mod in_memory_store;
mod postgres_store;
mod web_push_sender;

pub use delivery_bridge::{DeliveryBridge, DeliveryReport};
pub use in_memory_store::InMemorySubscriptionStore;
pub use postgres_store::PostgresSubscriptionStore;
pub use web_push_sender::{WebPushSender, WebPushSetupError};
