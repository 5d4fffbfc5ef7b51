//! Realtime handlers.
//!
//! ## Commands
//! - Calling a waiter from a customer table

mod call_waiter;

pub use call_waiter::{CallWaiterCommand, CallWaiterHandler, CallWaiterResult};
