//! SubscriptionStore port - durable storage for push subscriptions.
//!
//! Written by two parties: client opt-in/opt-out and the delivery bridge's
//! cleanup after a terminal push failure. Writes for one
//! `(subscriber id, endpoint)` key must be serialized, and cleanup must never
//! delete a record that was re-created after the failing delivery started.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::push::{PushSubscription, Recipient};
use crate::domain::realtime::StaffRole;

/// Errors that can occur in subscription store operations.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionStoreError {
    /// Backend communication error
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be turned back into a subscription
    #[error("Corrupt subscription record: {0}")]
    Corrupt(String),
}

impl From<SubscriptionStoreError> for DomainError {
    fn from(err: SubscriptionStoreError) -> Self {
        DomainError::new(ErrorCode::DatabaseError, err.to_string())
    }
}

/// Port for persisting push subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert, or replace the record with the same subscriber id and endpoint.
    async fn save(&self, subscription: PushSubscription) -> Result<(), SubscriptionStoreError>;

    /// Delete on explicit unsubscribe. Returns whether a record existed.
    async fn remove(
        &self,
        subscriber_id: &str,
        endpoint: &str,
    ) -> Result<bool, SubscriptionStoreError>;

    /// Delete `subscription` only if the stored record is still that exact one.
    ///
    /// Used by delivery cleanup so a concurrent re-subscribe survives.
    async fn remove_if_unchanged(
        &self,
        subscription: &PushSubscription,
    ) -> Result<bool, SubscriptionStoreError>;

    /// Subscriptions that reach `recipient`.
    async fn find_for(
        &self,
        recipient: &Recipient,
    ) -> Result<Vec<PushSubscription>, SubscriptionStoreError>;

    /// Staff users with at least one subscription under one of `roles`.
    async fn staff_with_roles(
        &self,
        roles: &BTreeSet<StaffRole>,
    ) -> Result<Vec<UserId>, SubscriptionStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SubscriptionStore) {}

    #[test]
    fn store_error_maps_to_database_domain_error() {
        let err: DomainError = SubscriptionStoreError::Corrupt("bad role".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn store_error_displays_backend_message() {
        let err = SubscriptionStoreError::Database("pool timed out".to_string());
        assert_eq!(err.to_string(), "Database error: pool timed out");
    }
}
