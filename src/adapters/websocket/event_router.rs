//! Event router connecting domain events to live sockets and the push
//! fallback.
//!
//! # Event Flow
//!
//! ```text
//! publish(event)
//!      │
//!      ▼
//! ┌──────────────────────┐
//! │ serialize {type,data}│  once per event
//! └──────────────────────┘
//!      │
//!      ▼
//! ┌──────────────────────┐
//! │ registry.targets     │  under the dispatch lock
//! │ send to each target  │  failures isolated per target
//! └──────────────────────┘
//!      │
//!      ▼
//! ┌──────────────────────┐
//! │ offline recipients   │  identities in scope not reached live
//! │ DeliveryBridge       │  one push per stored subscription
//! └──────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::adapters::push::{DeliveryBridge, DeliveryReport};
use crate::domain::foundation::{ConnectionId, DomainError, UserId};
use crate::domain::push::Recipient;
use crate::domain::realtime::{Event, EventType, Identity, Scope};
use crate::ports::{ConnectionRegistry, EventPublisher, LiveTarget};

/// What happened to one routed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub event_type: EventType,
    /// Live connections the envelope was queued on.
    pub live_delivered: usize,
    /// Connections whose write failed; they were removed.
    pub failed_connections: Vec<ConnectionId>,
    /// Push outcome per offline recipient, in dispatch order.
    pub push: Vec<(Recipient, DeliveryReport)>,
}

impl RouteReport {
    fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            live_delivered: 0,
            failed_connections: Vec::new(),
            push: Vec::new(),
        }
    }

    /// Push sends attempted across all recipients.
    pub fn push_attempts(&self) -> usize {
        self.push.iter().map(|(_, report)| report.attempted).sum()
    }
}

/// Routes events to matching live connections, then to push subscriptions
/// of identities that are offline.
pub struct EventRouter {
    registry: Arc<dyn ConnectionRegistry>,
    bridge: Option<Arc<DeliveryBridge>>,
    /// Held for the live fan-out of one event, so every connection sees
    /// events in the order the router accepted them.
    dispatch: Mutex<()>,
}

impl EventRouter {
    /// Router with live delivery only.
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            registry,
            bridge: None,
            dispatch: Mutex::new(()),
        }
    }

    /// Router that falls back to push for offline identities.
    pub fn with_push(registry: Arc<dyn ConnectionRegistry>, bridge: Arc<DeliveryBridge>) -> Self {
        Self {
            registry,
            bridge: Some(bridge),
            dispatch: Mutex::new(()),
        }
    }

    /// Create as an Arc (for sharing with handlers).
    pub fn new_shared(
        registry: Arc<dyn ConnectionRegistry>,
        bridge: Option<Arc<DeliveryBridge>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            bridge,
            dispatch: Mutex::new(()),
        })
    }

    /// Route one event. Never fails: every failure is local to one target.
    pub async fn route(&self, event: &Event) -> RouteReport {
        let mut report = RouteReport::new(event.event_type());

        let envelope: Arc<str> = match serde_json::to_string(&event.payload) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(event_type = %event.event_type(), error = %e, "Event serialization failed");
                return report;
            }
        };

        let (failed, reached) = {
            let _order = self.dispatch.lock().await;
            let targets = self.registry.targets(&event.scope).await;
            let mut failed: Vec<LiveTarget> = Vec::new();
            let mut reached: HashSet<UserId> = HashSet::new();
            for target in targets {
                match target.transport.send_text(envelope.clone()) {
                    Ok(()) => {
                        report.live_delivered += 1;
                        if let Identity::Staff { user_id, .. } = target.identity {
                            reached.insert(user_id);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %target.connection_id,
                            event_type = %event.event_type(),
                            error = %e,
                            "Write failed; dropping connection"
                        );
                        failed.push(target);
                    }
                }
            }
            (failed, reached)
        };

        for target in &failed {
            self.registry.remove(&target.connection_id).await;
            report.failed_connections.push(target.connection_id);
        }

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type(),
            scope = %event.scope,
            live = report.live_delivered,
            failed = report.failed_connections.len(),
            "Event dispatched to live connections"
        );

        let Some(bridge) = &self.bridge else {
            return report;
        };

        // Failed targets were removed above, so their identities count as
        // offline here unless another connection of theirs was reached.
        match &event.scope {
            Scope::BroadcastToRoles(roles) => {
                for user_id in bridge.subscribed_staff(roles).await {
                    if reached.contains(&user_id) {
                        continue;
                    }
                    let outcome = bridge.deliver_in_roles(user_id, roles, event).await;
                    report.push.push((Recipient::User(user_id), outcome));
                }
            }
            Scope::TargetTable(table_id) => {
                self.deliver_if_unreachable(bridge, Recipient::Table(*table_id), event, &mut report)
                    .await;
            }
            Scope::TargetUser(user_id) => {
                self.deliver_if_unreachable(bridge, Recipient::User(*user_id), event, &mut report)
                    .await;
            }
        }

        report
    }

    async fn deliver_if_unreachable(
        &self,
        bridge: &DeliveryBridge,
        recipient: Recipient,
        event: &Event,
        report: &mut RouteReport,
    ) {
        if self.registry.is_reachable(&recipient).await {
            return;
        }
        let outcome = bridge.deliver(&recipient, event).await;
        report.push.push((recipient, outcome));
    }
}

#[async_trait]
impl EventPublisher for EventRouter {
    async fn publish(&self, event: Event) -> Result<(), DomainError> {
        let report = self.route(&event).await;
        if report.live_delivered == 0 && report.push.is_empty() {
            tracing::debug!(event_type = %report.event_type, "Event had no recipients");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::push::InMemorySubscriptionStore;
    use crate::adapters::websocket::registry::InMemoryConnectionRegistry;
    use crate::adapters::websocket::transport::{ChannelTransport, OutboundFrame};
    use crate::domain::foundation::{OrderId, TableId, Timestamp, UserId};
    use crate::domain::push::{PushKeys, PushNotification, PushSubscription, Subscriber};
    use crate::domain::realtime::{OrderStatus, OrderSummary, StaffRole};
    use crate::ports::{DeliveryError, PushSender, SubscriptionStore};
    use tokio::sync::mpsc;

    struct NullSender;

    #[derive(Default)]
    struct RecordingSender {
        endpoints: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushSender for RecordingSender {
        async fn send(
            &self,
            subscription: &PushSubscription,
            _notification: &PushNotification,
        ) -> Result<(), DeliveryError> {
            self.endpoints
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl PushSender for NullSender {
        async fn send(
            &self,
            _subscription: &PushSubscription,
            _notification: &PushNotification,
        ) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn table(id: i64) -> TableId {
        TableId::new(id).unwrap()
    }

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn connect(
        registry: &InMemoryConnectionRegistry,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (transport, rx) = ChannelTransport::channel();
        (registry.accept(transport).await, rx)
    }

    fn texts(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let OutboundFrame::Text(text) = frame {
                out.push(text.to_string());
            }
        }
        out
    }

    fn order(id: i64, status: OrderStatus) -> OrderSummary {
        OrderSummary {
            id: OrderId::new(id).unwrap(),
            table_id: table(7),
            status,
            total_cents: 4200,
            item_count: 3,
            updated_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_staff_but_not_customers() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (waiter, mut waiter_rx) = connect(&registry).await;
        let (customer, mut customer_rx) = connect(&registry).await;
        registry.authenticate(&waiter, user(5), StaffRole::Waiter).await.unwrap();
        registry.join_table(&customer, table(7)).await.unwrap();

        let router = EventRouter::new(registry.clone());
        let report = router.route(&Event::waiter_called(table(7))).await;

        assert_eq!(report.live_delivered, 1);
        assert_eq!(
            texts(&mut waiter_rx),
            vec![r#"{"type":"WAITER_CALLED","data":{"tableNumber":7}}"#]
        );
        assert!(texts(&mut customer_rx).is_empty());
    }

    #[tokio::test]
    async fn unauthenticated_connections_receive_nothing() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (_anon, mut rx) = connect(&registry).await;

        let router = EventRouter::new(registry.clone());
        router.route(&Event::waiter_called(table(1))).await;

        assert!(texts(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn events_reach_a_connection_in_publish_order() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (staff, mut rx) = connect(&registry).await;
        registry.authenticate(&staff, user(1), StaffRole::Admin).await.unwrap();
        let router = EventRouter::new(registry.clone());

        let statuses = [OrderStatus::Pending, OrderStatus::Preparing, OrderStatus::Ready];
        for status in statuses {
            router.route(&Event::order_updated(order(9, status))).await;
        }

        let received: Vec<String> = texts(&mut rx)
            .into_iter()
            .map(|t| {
                let v: serde_json::Value = serde_json::from_str(&t).unwrap();
                v["data"]["status"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(received, vec!["pending", "preparing", "ready"]);
    }

    #[tokio::test]
    async fn failed_write_removes_only_that_connection() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (a, mut a_rx) = connect(&registry).await;
        let (b, b_rx) = connect(&registry).await;
        let (c, mut c_rx) = connect(&registry).await;
        for (id, uid) in [(a, 1), (b, 2), (c, 3)] {
            registry.authenticate(&id, user(uid), StaffRole::Waiter).await.unwrap();
        }
        drop(b_rx);

        let router = EventRouter::new(registry.clone());
        let report = router.route(&Event::waiter_called(table(4))).await;

        assert_eq!(report.live_delivered, 2);
        assert_eq!(report.failed_connections, vec![b]);
        assert_eq!(texts(&mut a_rx).len(), 1);
        assert_eq!(texts(&mut c_rx).len(), 1);
        assert_eq!(registry.identity(&b).await, None);
    }

    #[tokio::test]
    async fn offline_table_without_subscription_is_dropped() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let store = Arc::new(InMemorySubscriptionStore::new());
        let bridge = Arc::new(DeliveryBridge::new(store, Arc::new(NullSender)));
        let router = EventRouter::with_push(registry, bridge);

        let event =
            Event::order_updated(order(9, OrderStatus::Ready)).with_scope(Scope::table(table(7)));
        let report = router.route(&event).await;

        assert_eq!(report.live_delivered, 0);
        assert_eq!(report.push.len(), 1);
        assert_eq!(report.push_attempts(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_routes_keep_one_order_across_connections() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let mut receivers = Vec::new();
        for uid in 1..=6 {
            let (id, rx) = connect(&registry).await;
            registry.authenticate(&id, user(uid), StaffRole::Waiter).await.unwrap();
            receivers.push(rx);
        }
        let router = Arc::new(EventRouter::new(registry.clone()));

        let routes: Vec<_> = (1..=200)
            .map(|t| {
                let router = router.clone();
                tokio::spawn(async move { router.route(&Event::waiter_called(table(t))).await })
            })
            .collect();
        for route in routes {
            route.await.unwrap();
        }

        let first = texts(&mut receivers[0]);
        assert_eq!(first.len(), 200);
        for rx in receivers.iter_mut().skip(1) {
            assert_eq!(texts(rx), first);
        }
    }

    #[tokio::test]
    async fn role_broadcast_pushes_only_subscriptions_in_scope() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let store = Arc::new(InMemorySubscriptionStore::new());
        for (role, endpoint) in [
            (StaffRole::Waiter, "https://push.example/waiter"),
            (StaffRole::Manager, "https://push.example/manager"),
        ] {
            let subscriber = Subscriber::Staff {
                user_id: user(5),
                role,
            };
            let keys = PushKeys {
                p256dh: "p256dh".to_string(),
                auth: "auth".to_string(),
            };
            store
                .save(PushSubscription::new(subscriber, endpoint, keys).unwrap())
                .await
                .unwrap();
        }
        let sender = Arc::new(RecordingSender::default());
        let bridge = Arc::new(DeliveryBridge::new(store, sender.clone()));
        let router = EventRouter::with_push(registry.clone(), bridge);

        // Live as a waiter, so a manager-only event is not delivered live.
        let (id, mut rx) = connect(&registry).await;
        registry.authenticate(&id, user(5), StaffRole::Waiter).await.unwrap();

        let event = Event::waiter_called(table(3)).with_scope(Scope::roles([StaffRole::Manager]));
        let report = router.route(&event).await;

        assert_eq!(report.live_delivered, 0);
        assert!(texts(&mut rx).is_empty());
        assert_eq!(
            *sender.endpoints.lock().unwrap(),
            vec!["https://push.example/manager".to_string()]
        );

        router.route(&Event::waiter_called(table(3))).await;
        assert_eq!(texts(&mut rx).len(), 1);
        assert_eq!(sender.endpoints.lock().unwrap().len(), 1);
    }
}
