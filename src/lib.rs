//! Taproom Realtime - live event distribution for the Taproom point-of-sale.
//!
//! Routes order, table and waiter-call events to staff dashboards and
//! customer table sessions over WebSocket, falling back to Web Push for
//! identities with no live connection.

pub mod adapters;
pub mod app;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
