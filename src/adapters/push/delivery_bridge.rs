//! Delivery bridge: push fallback for identities with no live connection.
//!
//! ```text
//! Router ── offline recipient ──▶ DeliveryBridge
//!                                     │ find_for(recipient)
//!                                     ▼
//!                              SubscriptionStore
//!                                     │ one send per subscription
//!                                     ▼
//!                                 PushSender ── 404/410 ──▶ remove_if_unchanged
//! ```
//!
//! Delivery is at most once. Nothing is queued or retried: no subscription,
//! a store error, or a transient push failure all drop the event with a log.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::domain::foundation::UserId;
use crate::domain::push::{PushNotification, PushSubscription, Recipient, Subscriber};
use crate::domain::realtime::{Event, StaffRole};
use crate::ports::{DeliveryError, PushSender, SubscriptionStore};

/// Outcome of delivering one event to one recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscriptions a send was attempted on.
    pub attempted: usize,
    pub delivered: usize,
    /// Subscriptions deleted after a terminal failure.
    pub removed: usize,
    /// Transient failures, logged and dropped.
    pub dropped: usize,
}

pub struct DeliveryBridge {
    store: Arc<dyn SubscriptionStore>,
    sender: Arc<dyn PushSender>,
}

impl DeliveryBridge {
    pub fn new(store: Arc<dyn SubscriptionStore>, sender: Arc<dyn PushSender>) -> Self {
        Self { store, sender }
    }

    /// Staff users with a stored subscription under one of `roles`.
    ///
    /// A store failure degrades to "nobody", so live delivery is unaffected.
    pub async fn subscribed_staff(&self, roles: &BTreeSet<StaffRole>) -> Vec<UserId> {
        match self.store.staff_with_roles(roles).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load subscribed staff; skipping push fallback");
                Vec::new()
            }
        }
    }

    /// Push `event` to every subscription of `recipient`, once each.
    pub async fn deliver(&self, recipient: &Recipient, event: &Event) -> DeliveryReport {
        let Some(subscriptions) = self.lookup(recipient, event).await else {
            return DeliveryReport::default();
        };
        self.send_all(recipient, subscriptions, event).await
    }

    /// Like [`deliver`](Self::deliver) for a staff user, but only on the
    /// subscriptions registered under one of `roles`.
    pub async fn deliver_in_roles(
        &self,
        user_id: UserId,
        roles: &BTreeSet<StaffRole>,
        event: &Event,
    ) -> DeliveryReport {
        let recipient = Recipient::User(user_id);
        let Some(subscriptions) = self.lookup(&recipient, event).await else {
            return DeliveryReport::default();
        };
        let in_scope = subscriptions
            .into_iter()
            .filter(|s| matches!(&s.subscriber, Subscriber::Staff { role, .. } if roles.contains(role)))
            .collect();
        self.send_all(&recipient, in_scope, event).await
    }

    async fn lookup(&self, recipient: &Recipient, event: &Event) -> Option<Vec<PushSubscription>> {
        match self.store.find_for(recipient).await {
            Ok(subscriptions) => Some(subscriptions),
            Err(e) => {
                tracing::warn!(
                    recipient = %recipient,
                    event_type = %event.event_type(),
                    error = %e,
                    "Subscription lookup failed; dropping push"
                );
                None
            }
        }
    }

    async fn send_all(
        &self,
        recipient: &Recipient,
        subscriptions: Vec<PushSubscription>,
        event: &Event,
    ) -> DeliveryReport {
        if subscriptions.is_empty() {
            tracing::debug!(
                recipient = %recipient,
                event_type = %event.event_type(),
                "No push subscription; event dropped"
            );
            return DeliveryReport::default();
        }

        let notification = PushNotification::from_event(&event.payload);
        let outcomes = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.sender.send(subscription, &notification)),
        )
        .await;

        let mut report = DeliveryReport {
            attempted: subscriptions.len(),
            ..DeliveryReport::default()
        };
        for (subscription, outcome) in subscriptions.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Terminal { status }) => {
                    if self.prune(subscription, status).await {
                        report.removed += 1;
                    }
                }
                Err(e) => {
                    tracing::info!(
                        recipient = %recipient,
                        endpoint = %subscription.endpoint,
                        error = %e,
                        "Transient push failure; dropped"
                    );
                    report.dropped += 1;
                }
            }
        }

        tracing::debug!(
            recipient = %recipient,
            event_type = %event.event_type(),
            attempted = report.attempted,
            delivered = report.delivered,
            removed = report.removed,
            "Push fallback finished"
        );
        report
    }

    async fn prune(&self, subscription: &PushSubscription, status: u16) -> bool {
        match self.store.remove_if_unchanged(subscription).await {
            Ok(true) => {
                tracing::info!(
                    subscriber = %subscription.subscriber_id(),
                    endpoint = %subscription.endpoint,
                    status,
                    "Removed expired push subscription"
                );
                true
            }
            Ok(false) => {
                tracing::debug!(
                    subscriber = %subscription.subscriber_id(),
                    "Subscription replaced since lookup; kept"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    subscriber = %subscription.subscriber_id(),
                    error = %e,
                    "Failed to remove expired push subscription"
                );
                false
            }
        }
    }
}
