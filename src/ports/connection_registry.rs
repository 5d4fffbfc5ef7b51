//! ConnectionRegistry port - Interface for tracking live realtime connections.
//!
//! The registry is the single process-wide record of which transports are
//! open, who is on the other end, and which topics they belong to. The router
//! resolves every event against it at dispatch time.
//!
//! ## Lifecycle of an entry
//!
//! 1. Transport accepted -> `accept` registers it unauthenticated
//! 2. `AUTH` / `JOIN_TABLE` -> `authenticate` / `join_table` attach an identity
//! 3. Transport closed, idle, or a write failed -> `remove`
//! 4. Process shutdown -> `drain` closes every transport

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::foundation::{ConnectionId, TableId, UserId};
use crate::domain::push::Recipient;
use crate::domain::realtime::{Identity, Scope, StaffRole};

use super::Transport;

/// Errors raised when attaching an identity to a connection.
///
/// The connection stays open and unauthenticated after either of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The connection already holds an identity.
    #[error("Connection is already authenticated")]
    AlreadyAuthenticated,

    /// The connection id is stale (its transport already closed).
    #[error("Unknown connection")]
    UnknownConnection,
}

/// A live connection selected for delivery.
#[derive(Clone)]
pub struct LiveTarget {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for LiveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTarget")
            .field("connection_id", &self.connection_id)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Connection counts by identity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub unauthenticated: usize,
    pub staff: usize,
    pub customers: usize,
}

/// Port for the live connection registry.
///
/// Implementations must make each operation atomic with respect to the
/// others, so membership never loses an update while a broadcast is in
/// flight.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Register a freshly accepted transport as unauthenticated.
    async fn accept(&self, transport: Arc<dyn Transport>) -> ConnectionId;

    /// Attach a staff identity.
    async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
        role: StaffRole,
    ) -> Result<(), AuthError>;

    /// Attach (or re-scope) a customer identity bound to one table.
    async fn join_table(
        &self,
        connection_id: &ConnectionId,
        table_id: TableId,
    ) -> Result<(), AuthError>;

    /// Forget a connection. Idempotent; returns whether it was present.
    async fn remove(&self, connection_id: &ConnectionId) -> bool;

    /// Ids of live connections addressed by `scope`, computed fresh.
    async fn matching(&self, scope: &Scope) -> HashSet<ConnectionId>;

    /// Live connections addressed by `scope`, with their transports.
    async fn targets(&self, scope: &Scope) -> Vec<LiveTarget>;

    /// Current identity of a connection, if it is live.
    async fn identity(&self, connection_id: &ConnectionId) -> Option<Identity>;

    /// Whether any live connection would receive events for `recipient`.
    async fn is_reachable(&self, recipient: &Recipient) -> bool;

    /// Connection counts for health reporting.
    async fn stats(&self) -> RegistryStats;

    /// Close every transport with `code` and empty the registry.
    ///
    /// Returns the number of connections drained.
    async fn drain(&self, code: u16, reason: &str) -> usize;
}
