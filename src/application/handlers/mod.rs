//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod push;
pub mod realtime;

pub use push::{
    SubscribePushCommand, SubscribePushHandler, UnsubscribePushCommand, UnsubscribePushHandler,
};
pub use realtime::{CallWaiterCommand, CallWaiterHandler, CallWaiterResult};
