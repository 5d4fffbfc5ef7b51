//! Domain layer containing the realtime vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machines)
//! - `realtime` - Identities, scopes, events and the client session lifecycle
//! - `push` - Push subscriptions and notification payloads

pub mod foundation;
pub mod push;
pub mod realtime;
