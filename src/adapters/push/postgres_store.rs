//! PostgreSQL implementation of SubscriptionStore.
//!
//! One row per `(subscriber_id, endpoint)`. Saving upserts on that key, and
//! removal after a terminal push failure is conditional on `created_at` so a
//! concurrent re-subscribe survives.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DeviceId, TableId, Timestamp, UserId};
use crate::domain::push::{PushKeys, PushSubscription, Recipient, Subscriber};
use crate::domain::realtime::StaffRole;
use crate::ports::{SubscriptionStore, SubscriptionStoreError};

const KIND_STAFF: &str = "staff";
const KIND_DEVICE: &str = "device";

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a push subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    subscriber_kind: String,
    user_id: Option<i64>,
    role: Option<String>,
    device_id: Option<String>,
    table_id: Option<i64>,
    endpoint: String,
    p256dh: String,
    auth: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for PushSubscription {
    type Error = SubscriptionStoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            SubscriptionStoreError::Corrupt(format!("{} for endpoint {}", what, row.endpoint))
        };

        let subscriber = match row.subscriber_kind.as_str() {
            KIND_STAFF => {
                let user_id = row
                    .user_id
                    .and_then(|id| UserId::new(id).ok())
                    .ok_or_else(|| corrupt("missing or invalid user_id"))?;
                let role = row
                    .role
                    .as_deref()
                    .and_then(|r| r.parse::<StaffRole>().ok())
                    .ok_or_else(|| corrupt("missing or invalid role"))?;
                Subscriber::Staff { user_id, role }
            }
            KIND_DEVICE => {
                let device_id = row
                    .device_id
                    .clone()
                    .and_then(|id| DeviceId::new(id).ok())
                    .ok_or_else(|| corrupt("missing device_id"))?;
                let table_id = row
                    .table_id
                    .and_then(|id| TableId::new(id).ok())
                    .ok_or_else(|| corrupt("missing or invalid table_id"))?;
                Subscriber::Device {
                    device_id,
                    table_id,
                }
            }
            other => return Err(corrupt(&format!("unknown subscriber kind '{}'", other))),
        };

        Ok(PushSubscription {
            subscriber,
            endpoint: row.endpoint,
            keys: PushKeys {
                p256dh: row.p256dh,
                auth: row.auth,
            },
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> SubscriptionStoreError {
    SubscriptionStoreError::Database(format!("Failed to {}: {}", action, e))
}

fn rows_to_subscriptions(
    rows: Vec<SubscriptionRow>,
) -> Result<Vec<PushSubscription>, SubscriptionStoreError> {
    rows.into_iter().map(PushSubscription::try_from).collect()
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn save(&self, subscription: PushSubscription) -> Result<(), SubscriptionStoreError> {
        let (kind, user_id, role, device_id, table_id) = match &subscription.subscriber {
            Subscriber::Staff { user_id, role } => (
                KIND_STAFF,
                Some(user_id.value()),
                Some(role.as_str()),
                None,
                None,
            ),
            Subscriber::Device {
                device_id,
                table_id,
            } => (
                KIND_DEVICE,
                None,
                None,
                Some(device_id.as_str()),
                Some(table_id.value()),
            ),
        };

        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (
                subscriber_id, endpoint, subscriber_kind, user_id, role,
                device_id, table_id, p256dh, auth, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (subscriber_id, endpoint) DO UPDATE SET
                subscriber_kind = EXCLUDED.subscriber_kind,
                user_id = EXCLUDED.user_id,
                role = EXCLUDED.role,
                device_id = EXCLUDED.device_id,
                table_id = EXCLUDED.table_id,
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(subscription.subscriber_id())
        .bind(&subscription.endpoint)
        .bind(kind)
        .bind(user_id)
        .bind(role)
        .bind(device_id)
        .bind(table_id)
        .bind(&subscription.keys.p256dh)
        .bind(&subscription.keys.auth)
        .bind(subscription.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save push subscription", e))?;

        Ok(())
    }

    async fn remove(
        &self,
        subscriber_id: &str,
        endpoint: &str,
    ) -> Result<bool, SubscriptionStoreError> {
        let result = sqlx::query(
            "DELETE FROM push_subscriptions WHERE subscriber_id = $1 AND endpoint = $2",
        )
        .bind(subscriber_id)
        .bind(endpoint)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("remove push subscription", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_if_unchanged(
        &self,
        subscription: &PushSubscription,
    ) -> Result<bool, SubscriptionStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM push_subscriptions
            WHERE subscriber_id = $1 AND endpoint = $2 AND created_at = $3
            "#,
        )
        .bind(subscription.subscriber_id())
        .bind(&subscription.endpoint)
        .bind(subscription.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("remove stale push subscription", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_for(
        &self,
        recipient: &Recipient,
    ) -> Result<Vec<PushSubscription>, SubscriptionStoreError> {
        let (sql, kind, id) = match recipient {
            Recipient::User(user_id) => (
                r#"
                SELECT subscriber_kind, user_id, role, device_id, table_id,
                       endpoint, p256dh, auth, created_at
                FROM push_subscriptions
                WHERE subscriber_kind = $1 AND user_id = $2
                "#,
                KIND_STAFF,
                user_id.value(),
            ),
            Recipient::Table(table_id) => (
                r#"
                SELECT subscriber_kind, user_id, role, device_id, table_id,
                       endpoint, p256dh, auth, created_at
                FROM push_subscriptions
                WHERE subscriber_kind = $1 AND table_id = $2
                "#,
                KIND_DEVICE,
                table_id.value(),
            ),
        };

        let rows: Vec<SubscriptionRow> = sqlx::query_as(sql)
            .bind(kind)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("load push subscriptions", e))?;

        rows_to_subscriptions(rows)
    }

    async fn staff_with_roles(
        &self,
        roles: &BTreeSet<StaffRole>,
    ) -> Result<Vec<UserId>, SubscriptionStoreError> {
        let roles: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT user_id FROM push_subscriptions
            WHERE subscriber_kind = $1 AND role = ANY($2) AND user_id IS NOT NULL
            ORDER BY user_id
            "#,
        )
        .bind(KIND_STAFF)
        .bind(&roles)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load subscribed staff", e))?;

        ids.into_iter()
            .map(|id| {
                UserId::new(id).map_err(|e| SubscriptionStoreError::Corrupt(e.to_string()))
            })
            .collect()
    }
}
