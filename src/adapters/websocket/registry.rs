//! In-memory connection registry.
//!
//! Every live socket has one entry holding its identity, the topics derived
//! from that identity, and its transport. Routing resolves a scope to
//! entries by topic intersection at dispatch time:
//!
//! ```text
//! role:staff ── conn-a (user:5, waiter)   table:7 ── conn-d (customer)
//! role:waiter ─ conn-a                              ── conn-e (customer)
//! role:admin ── conn-b (user:1, admin)    table:8 ── conn-f (customer)
//! ```
//!
//! A `NEW_ORDER` for all staff reaches a and b; a `TABLE_UPDATED` for
//! table 7 reaches d and e only.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{ConnectionId, TableId, UserId};
use crate::domain::push::Recipient;
use crate::domain::realtime::{Identity, Scope, StaffRole, Topic};
use crate::ports::{AuthError, ConnectionRegistry, LiveTarget, RegistryStats, Transport};

struct ConnectionEntry {
    identity: Identity,
    topics: BTreeSet<Topic>,
    transport: Arc<dyn Transport>,
}

impl ConnectionEntry {
    fn set_identity(&mut self, identity: Identity) {
        self.topics = identity.topics();
        self.identity = identity;
    }

    fn is_addressed_by(&self, wanted: &BTreeSet<Topic>) -> bool {
        !self.topics.is_disjoint(wanted)
    }
}

/// Registry of live connections behind a single `RwLock`.
///
/// Broadcasts (reads) vastly outnumber connects and identity changes
/// (writes), so concurrent routing of unrelated events never contends.
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn accept(&self, transport: Arc<dyn Transport>) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections.write().await.insert(
            connection_id,
            ConnectionEntry {
                identity: Identity::Unauthenticated,
                topics: BTreeSet::new(),
                transport,
            },
        );
        tracing::debug!(connection_id = %connection_id, "Connection accepted");
        connection_id
    }

    async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
        role: StaffRole,
    ) -> Result<(), AuthError> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(connection_id)
            .ok_or(AuthError::UnknownConnection)?;

        if entry.identity.is_authenticated() {
            tracing::warn!(
                connection_id = %connection_id,
                current = entry.identity.kind(),
                "Rejected duplicate AUTH"
            );
            return Err(AuthError::AlreadyAuthenticated);
        }

        entry.set_identity(Identity::staff(user_id, role));
        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            role = %role,
            "Staff connection authenticated"
        );
        Ok(())
    }

    async fn join_table(
        &self,
        connection_id: &ConnectionId,
        table_id: TableId,
    ) -> Result<(), AuthError> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(connection_id)
            .ok_or(AuthError::UnknownConnection)?;

        if let Identity::Staff { .. } = entry.identity {
            tracing::warn!(connection_id = %connection_id, "Staff connection tried to JOIN_TABLE");
            return Err(AuthError::AlreadyAuthenticated);
        }

        let previous = entry.identity.table_id();
        entry.set_identity(Identity::customer(table_id));
        tracing::info!(
            connection_id = %connection_id,
            table_id = %table_id,
            previous_table = ?previous.map(|t| t.value()),
            "Customer connection joined table"
        );
        Ok(())
    }

    async fn remove(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(connection_id);
        if let Some(entry) = &removed {
            tracing::debug!(
                connection_id = %connection_id,
                identity = entry.identity.kind(),
                "Connection removed"
            );
        }
        removed.is_some()
    }

    async fn matching(&self, scope: &Scope) -> HashSet<ConnectionId> {
        let wanted = scope.topics();
        self.connections
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_addressed_by(&wanted))
            .map(|(id, _)| *id)
            .collect()
    }

    async fn targets(&self, scope: &Scope) -> Vec<LiveTarget> {
        let wanted = scope.topics();
        self.connections
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_addressed_by(&wanted))
            .map(|(id, entry)| LiveTarget {
                connection_id: *id,
                identity: entry.identity,
                transport: entry.transport.clone(),
            })
            .collect()
    }

    async fn identity(&self, connection_id: &ConnectionId) -> Option<Identity> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .map(|entry| entry.identity)
    }

    async fn is_reachable(&self, recipient: &Recipient) -> bool {
        let topic = match recipient {
            Recipient::User(user_id) => Topic::User(*user_id),
            Recipient::Table(table_id) => Topic::Table(*table_id),
        };
        self.connections
            .read()
            .await
            .values()
            .any(|entry| entry.topics.contains(&topic))
    }

    async fn stats(&self) -> RegistryStats {
        let connections = self.connections.read().await;
        let mut stats = RegistryStats {
            total: connections.len(),
            ..RegistryStats::default()
        };
        for entry in connections.values() {
            match entry.identity {
                Identity::Unauthenticated => stats.unauthenticated += 1,
                Identity::Staff { .. } => stats.staff += 1,
                Identity::Customer { .. } => stats.customers += 1,
            }
        }
        stats
    }

    async fn drain(&self, code: u16, reason: &str) -> usize {
        let drained = std::mem::take(&mut *self.connections.write().await);
        for (connection_id, entry) in &drained {
            if let Err(e) = entry.transport.close(code, reason) {
                tracing::debug!(connection_id = %connection_id, error = %e, "Close on drain failed");
            }
        }
        tracing::info!(count = drained.len(), code, "Registry drained");
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::transport::{ChannelTransport, OutboundFrame};
    use proptest::prelude::*;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn table(id: i64) -> TableId {
        TableId::new(id).unwrap()
    }

    async fn accept(registry: &InMemoryConnectionRegistry) -> ConnectionId {
        let (transport, _rx) = ChannelTransport::channel();
        registry.accept(transport).await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Identity
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn accepted_connection_is_unauthenticated_and_matches_nothing() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;

        assert_eq!(registry.identity(&id).await, Some(Identity::Unauthenticated));
        assert!(registry.matching(&Scope::all_staff()).await.is_empty());
        assert!(registry.matching(&Scope::table(table(1))).await.is_empty());
    }

    #[tokio::test]
    async fn authenticate_attaches_staff_topics() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;

        registry
            .authenticate(&id, user(5), StaffRole::Waiter)
            .await
            .unwrap();

        assert!(registry.matching(&Scope::all_staff()).await.contains(&id));
        assert!(registry
            .matching(&Scope::roles([StaffRole::Waiter]))
            .await
            .contains(&id));
        assert!(registry
            .matching(&Scope::roles([StaffRole::Admin]))
            .await
            .is_empty());
        assert!(registry.matching(&Scope::user(user(5))).await.contains(&id));
    }

    #[tokio::test]
    async fn second_auth_is_rejected_and_identity_kept() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;
        registry
            .authenticate(&id, user(5), StaffRole::Waiter)
            .await
            .unwrap();

        let err = registry
            .authenticate(&id, user(6), StaffRole::Admin)
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::AlreadyAuthenticated);
        assert_eq!(
            registry.identity(&id).await,
            Some(Identity::staff(user(5), StaffRole::Waiter))
        );
    }

    #[tokio::test]
    async fn auth_after_join_table_is_rejected() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;
        registry.join_table(&id, table(7)).await.unwrap();

        assert_eq!(
            registry.authenticate(&id, user(5), StaffRole::Admin).await,
            Err(AuthError::AlreadyAuthenticated)
        );
        assert!(registry.matching(&Scope::all_staff()).await.is_empty());
    }

    #[tokio::test]
    async fn staff_cannot_join_a_table() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;
        registry
            .authenticate(&id, user(2), StaffRole::Manager)
            .await
            .unwrap();

        assert_eq!(
            registry.join_table(&id, table(7)).await,
            Err(AuthError::AlreadyAuthenticated)
        );
    }

    #[tokio::test]
    async fn rejoining_moves_customer_to_the_new_table() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;
        registry.join_table(&id, table(7)).await.unwrap();
        registry.join_table(&id, table(8)).await.unwrap();

        assert!(registry.matching(&Scope::table(table(7))).await.is_empty());
        assert!(registry.matching(&Scope::table(table(8))).await.contains(&id));
    }

    #[tokio::test]
    async fn unknown_connection_is_reported() {
        let registry = InMemoryConnectionRegistry::new();
        let stale = ConnectionId::new();

        assert_eq!(
            registry.authenticate(&stale, user(1), StaffRole::Admin).await,
            Err(AuthError::UnknownConnection)
        );
        assert_eq!(
            registry.join_table(&stale, table(1)).await,
            Err(AuthError::UnknownConnection)
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Removal and queries
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = InMemoryConnectionRegistry::new();
        let id = accept(&registry).await;
        registry.join_table(&id, table(3)).await.unwrap();

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.matching(&Scope::table(table(3))).await.is_empty());
        assert_eq!(registry.identity(&id).await, None);
    }

    #[tokio::test]
    async fn reachability_follows_live_identities() {
        let registry = InMemoryConnectionRegistry::new();
        let staff = accept(&registry).await;
        let customer = accept(&registry).await;
        registry
            .authenticate(&staff, user(5), StaffRole::Waiter)
            .await
            .unwrap();
        registry.join_table(&customer, table(7)).await.unwrap();

        assert!(registry.is_reachable(&Recipient::User(user(5))).await);
        assert!(!registry.is_reachable(&Recipient::User(user(6))).await);
        assert!(registry.is_reachable(&Recipient::Table(table(7))).await);
        assert!(!registry.is_reachable(&Recipient::Table(table(8))).await);
    }

    #[tokio::test]
    async fn stats_count_by_identity_kind() {
        let registry = InMemoryConnectionRegistry::new();
        let a = accept(&registry).await;
        let b = accept(&registry).await;
        let _c = accept(&registry).await;
        registry.authenticate(&a, user(1), StaffRole::Admin).await.unwrap();
        registry.join_table(&b, table(2)).await.unwrap();

        assert_eq!(
            registry.stats().await,
            RegistryStats {
                total: 3,
                unauthenticated: 1,
                staff: 1,
                customers: 1,
            }
        );
    }

    #[tokio::test]
    async fn drain_closes_every_transport_and_empties_registry() {
        let registry = InMemoryConnectionRegistry::new();
        let (first, mut first_rx) = ChannelTransport::channel();
        let (second, mut second_rx) = ChannelTransport::channel();
        registry.accept(first).await;
        registry.accept(second).await;

        assert_eq!(registry.drain(1001, "shutting down").await, 2);
        assert_eq!(registry.stats().await.total, 0);

        for rx in [&mut first_rx, &mut second_rx] {
            assert_eq!(
                rx.try_recv().unwrap(),
                OutboundFrame::Close {
                    code: 1001,
                    reason: "shutting down".to_string()
                }
            );
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Properties
    // ════════════════════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn table_scope_matches_exactly_that_tables_customers(
            seats in proptest::collection::vec(1i64..6, 0..20),
            wanted in 1i64..6,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let registry = InMemoryConnectionRegistry::new();
                let mut expected = HashSet::new();
                for seat in &seats {
                    let id = accept(&registry).await;
                    registry.join_table(&id, table(*seat)).await.unwrap();
                    if *seat == wanted {
                        expected.insert(id);
                    }
                }
                // Staff never see table-scoped events.
                let staff = accept(&registry).await;
                registry.authenticate(&staff, user(1), StaffRole::Admin).await.unwrap();

                let matched = registry.matching(&Scope::table(table(wanted))).await;
                prop_assert_eq!(matched, expected);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
