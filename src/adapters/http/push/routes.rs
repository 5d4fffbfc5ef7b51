//! Route configuration for push opt-in endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{get_vapid_public_key, subscribe, unsubscribe, PushAppState};

/// Creates the push router.
///
/// Routes:
/// - `GET /api/push/vapid-public-key` - Public key for `pushManager.subscribe`
/// - `POST /api/push/subscribe` - Store or replace a subscription
/// - `POST /api/push/unsubscribe` - Delete a subscription
pub fn push_router() -> Router<PushAppState> {
    Router::new()
        .route("/api/push/vapid-public-key", get(get_vapid_public_key))
        .route("/api/push/subscribe", post(subscribe))
        .route("/api/push/unsubscribe", post(unsubscribe))
}
