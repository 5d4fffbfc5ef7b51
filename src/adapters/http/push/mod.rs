//! HTTP adapter for push opt-in.
//!
//! Exposes REST endpoints for:
//! - Fetching the public VAPID key
//! - Storing a browser push subscription
//! - Deleting a push subscription

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{PushApiError, PushAppState};
pub use routes::push_router;
