//! Push subscription handlers.
//!
//! ## Commands
//! - Subscribing a browser for push fallback
//! - Unsubscribing it

mod subscribe_push;
mod unsubscribe_push;

pub use subscribe_push::{SubscribePushCommand, SubscribePushHandler};
pub use unsubscribe_push::{UnsubscribePushCommand, UnsubscribePushHandler};
