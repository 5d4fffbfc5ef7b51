//! Integration tests for routing with the push fallback.
//!
//! These tests wire the real registry, router, delivery bridge and in-memory
//! subscription store, with a recording push sender in place of the network:
//! 1. Offline subscribers are pushed once per subscription
//! 2. Live identities are never pushed
//! 3. A write failure mid-broadcast isolates that target and falls back to push
//! 4. Terminal push failures delete the subscription

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use taproom_realtime::adapters::push::{DeliveryBridge, InMemorySubscriptionStore};
use taproom_realtime::adapters::websocket::{
    ChannelTransport, EventRouter, InMemoryConnectionRegistry, OutboundFrame,
};
use taproom_realtime::domain::foundation::{ConnectionId, DeviceId, TableId, UserId};
use taproom_realtime::domain::push::{PushKeys, PushNotification, PushSubscription, Subscriber};
use taproom_realtime::domain::realtime::{Event, Scope, StaffRole};
use taproom_realtime::ports::{
    ConnectionRegistry, DeliveryError, PushSender, SubscriptionStore,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Records every send; endpoints listed in `gone` answer 410.
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    gone: Mutex<Vec<String>>,
}

impl RecordingSender {
    fn endpoints(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    fn send_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for endpoint in self.endpoints() {
            *counts.entry(endpoint).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        notification: &PushNotification,
    ) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), notification.title.clone()));
        if self.gone.lock().unwrap().contains(&subscription.endpoint) {
            return Err(DeliveryError::Terminal { status: 410 });
        }
        Ok(())
    }
}

struct Harness {
    registry: Arc<InMemoryConnectionRegistry>,
    store: Arc<InMemorySubscriptionStore>,
    sender: Arc<RecordingSender>,
    router: Arc<EventRouter>,
}

impl Harness {
    fn new() -> Self {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let store = Arc::new(InMemorySubscriptionStore::new());
        let sender = Arc::new(RecordingSender::default());
        let bridge = Arc::new(DeliveryBridge::new(store.clone(), sender.clone()));
        let router = EventRouter::new_shared(registry.clone(), Some(bridge));
        Self {
            registry,
            store,
            sender,
            router,
        }
    }

    async fn connect_staff(
        &self,
        user_id: i64,
        role: StaffRole,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (transport, rx) = ChannelTransport::channel();
        let id = self.registry.accept(transport).await;
        self.registry.authenticate(&id, user(user_id), role).await.unwrap();
        (id, rx)
    }

    async fn subscribe_staff(&self, user_id: i64, role: StaffRole, endpoint: &str) {
        let subscriber = Subscriber::Staff {
            user_id: user(user_id),
            role,
        };
        self.store
            .save(PushSubscription::new(subscriber, endpoint, keys()).unwrap())
            .await
            .unwrap();
    }

    async fn subscribe_device(&self, device: &str, table_id: i64, endpoint: &str) {
        let subscriber = Subscriber::Device {
            device_id: DeviceId::new(device).unwrap(),
            table_id: table(table_id),
        };
        self.store
            .save(PushSubscription::new(subscriber, endpoint, keys()).unwrap())
            .await
            .unwrap();
    }
}

fn user(id: i64) -> UserId {
    UserId::new(id).unwrap()
}

fn table(id: i64) -> TableId {
    TableId::new(id).unwrap()
}

fn keys() -> PushKeys {
    PushKeys {
        p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".to_string(),
        auth: "tBHItJI5svbpez7KI4CCXg".to_string(),
    }
}

fn texts(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> usize {
    let mut count = 0;
    while let Ok(frame) = rx.try_recv() {
        if matches!(frame, OutboundFrame::Text(_)) {
            count += 1;
        }
    }
    count
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn offline_staff_get_one_push_per_subscription() {
    let h = Harness::new();
    h.subscribe_staff(5, StaffRole::Waiter, "https://push.example/phone").await;
    h.subscribe_staff(5, StaffRole::Waiter, "https://push.example/tablet").await;
    h.subscribe_staff(6, StaffRole::Manager, "https://push.example/office").await;

    let report = h.router.route(&Event::waiter_called(table(4))).await;

    assert_eq!(report.live_delivered, 0);
    assert_eq!(report.push_attempts(), 3);
    let counts = h.sender.send_counts();
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|&n| n == 1));
}

#[tokio::test]
async fn live_staff_are_not_pushed() {
    let h = Harness::new();
    h.subscribe_staff(5, StaffRole::Waiter, "https://push.example/phone").await;
    h.subscribe_staff(6, StaffRole::Waiter, "https://push.example/other").await;
    let (_id, mut rx) = h.connect_staff(5, StaffRole::Waiter).await;

    let report = h.router.route(&Event::waiter_called(table(4))).await;

    assert_eq!(report.live_delivered, 1);
    assert_eq!(texts(&mut rx), 1);
    assert_eq!(h.sender.endpoints(), vec!["https://push.example/other".to_string()]);
}

#[tokio::test]
async fn roles_outside_the_scope_are_not_pushed() {
    let h = Harness::new();
    h.subscribe_staff(5, StaffRole::Waiter, "https://push.example/waiter").await;
    h.subscribe_staff(6, StaffRole::Manager, "https://push.example/manager").await;

    let event = Event::waiter_called(table(4)).with_scope(Scope::roles([StaffRole::Manager]));
    h.router.route(&event).await;

    assert_eq!(h.sender.endpoints(), vec!["https://push.example/manager".to_string()]);
}

#[tokio::test]
async fn failed_write_mid_broadcast_falls_back_to_push_once() {
    let h = Harness::new();
    let (_first, mut first_rx) = h.connect_staff(1, StaffRole::Waiter).await;
    let (broken, broken_rx) = h.connect_staff(2, StaffRole::Waiter).await;
    let (_third, mut third_rx) = h.connect_staff(3, StaffRole::Manager).await;
    h.subscribe_staff(2, StaffRole::Waiter, "https://push.example/broken").await;
    drop(broken_rx);

    let report = h.router.route(&Event::waiter_called(table(9))).await;

    assert_eq!(report.live_delivered, 2);
    assert_eq!(report.failed_connections, vec![broken]);
    assert_eq!(texts(&mut first_rx), 1);
    assert_eq!(texts(&mut third_rx), 1);
    assert_eq!(h.sender.endpoints(), vec!["https://push.example/broken".to_string()]);
    assert_eq!(h.registry.stats().await.staff, 2);
}

#[tokio::test]
async fn offline_table_device_is_pushed_and_gone_subscription_removed() {
    let h = Harness::new();
    h.subscribe_device("tablet-a", 7, "https://push.example/a").await;
    h.subscribe_device("tablet-b", 7, "https://push.example/b").await;
    h.subscribe_device("tablet-c", 8, "https://push.example/c").await;
    h.sender
        .gone
        .lock()
        .unwrap()
        .push("https://push.example/b".to_string());

    let event = Event::waiter_called(table(7)).with_scope(Scope::table(table(7)));
    let report = h.router.route(&event).await;

    assert_eq!(report.push_attempts(), 2);
    assert_eq!(report.push[0].1.removed, 1);
    assert_eq!(h.store.len().await, 2);

    h.router.route(&event).await;
    assert_eq!(
        h.sender.send_counts().get("https://push.example/a"),
        Some(&2)
    );
    assert_eq!(
        h.sender.send_counts().get("https://push.example/b"),
        Some(&1)
    );
}

#[tokio::test]
async fn joined_table_gets_live_delivery_instead_of_push() {
    let h = Harness::new();
    h.subscribe_device("tablet-a", 7, "https://push.example/a").await;
    let (transport, mut rx) = ChannelTransport::channel();
    let id = h.registry.accept(transport).await;
    h.registry.join_table(&id, table(7)).await.unwrap();

    let event = Event::waiter_called(table(7)).with_scope(Scope::table(table(7)));
    let report = h.router.route(&event).await;

    assert_eq!(report.live_delivered, 1);
    assert_eq!(texts(&mut rx), 1);
    assert!(h.sender.endpoints().is_empty());
}
