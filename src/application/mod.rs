//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    // Push handlers
    SubscribePushCommand, SubscribePushHandler, UnsubscribePushCommand, UnsubscribePushHandler,
    // Realtime handlers
    CallWaiterCommand, CallWaiterHandler, CallWaiterResult,
};
