//! HTTP adapters - REST API implementations.

pub mod health;
pub mod push;

// Re-export key types for convenience
pub use health::{health_router, HealthState};
pub use push::{push_router, PushAppState};
