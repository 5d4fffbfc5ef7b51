//! In-memory subscription store.
//!
//! Used in tests and when no database is configured. Subscriptions do not
//! survive a restart; browsers re-subscribe on their next visit.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::domain::push::{PushSubscription, Recipient, Subscriber};
use crate::domain::realtime::StaffRole;
use crate::ports::{SubscriptionStore, SubscriptionStoreError};

type SubscriptionKey = (String, String);

/// Subscriptions keyed by `(subscriber id, endpoint)` behind one lock.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: RwLock<HashMap<SubscriptionKey, PushSubscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn key_of(subscription: &PushSubscription) -> SubscriptionKey {
    (subscription.subscriber_id(), subscription.endpoint.clone())
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn save(&self, subscription: PushSubscription) -> Result<(), SubscriptionStoreError> {
        self.records
            .write()
            .await
            .insert(key_of(&subscription), subscription);
        Ok(())
    }

    async fn remove(
        &self,
        subscriber_id: &str,
        endpoint: &str,
    ) -> Result<bool, SubscriptionStoreError> {
        let key = (subscriber_id.to_string(), endpoint.to_string());
        Ok(self.records.write().await.remove(&key).is_some())
    }

    async fn remove_if_unchanged(
        &self,
        subscription: &PushSubscription,
    ) -> Result<bool, SubscriptionStoreError> {
        let mut records = self.records.write().await;
        let key = key_of(subscription);
        match records.get(&key) {
            Some(current) if current.is_same_record(subscription) => {
                records.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_for(
        &self,
        recipient: &Recipient,
    ) -> Result<Vec<PushSubscription>, SubscriptionStoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|s| recipient.matches(&s.subscriber))
            .cloned()
            .collect())
    }

    async fn staff_with_roles(
        &self,
        roles: &BTreeSet<StaffRole>,
    ) -> Result<Vec<UserId>, SubscriptionStoreError> {
        let users: BTreeSet<UserId> = self
            .records
            .read()
            .await
            .values()
            .filter_map(|s| match &s.subscriber {
                Subscriber::Staff { user_id, role } if roles.contains(role) => Some(*user_id),
                _ => None,
            })
            .collect();
        Ok(users.into_iter().collect())
    }
}
