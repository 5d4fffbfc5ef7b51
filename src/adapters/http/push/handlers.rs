//! HTTP handlers for push opt-in endpoints.
//!
//! These handlers connect Axum routes to the push command handlers.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::push::{
    SubscribePushCommand, SubscribePushHandler, UnsubscribePushCommand, UnsubscribePushHandler,
};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::push::Subscriber;
use crate::ports::SubscriptionStore;

use super::dto::{
    ErrorResponse, SubscribeRequest, SubscriptionResponse, UnsubscribeRequest, VapidKeyResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the push endpoints.
#[derive(Clone)]
pub struct PushAppState {
    pub subscription_store: Arc<dyn SubscriptionStore>,
    /// `None` when push delivery is not configured.
    pub vapid_public_key: Option<String>,
}

impl PushAppState {
    pub fn new(
        subscription_store: Arc<dyn SubscriptionStore>,
        vapid_public_key: Option<String>,
    ) -> Self {
        Self {
            subscription_store,
            vapid_public_key,
        }
    }

    pub fn subscribe_handler(&self) -> SubscribePushHandler {
        SubscribePushHandler::new(self.subscription_store.clone())
    }

    pub fn unsubscribe_handler(&self) -> UnsubscribePushHandler {
        UnsubscribePushHandler::new(self.subscription_store.clone())
    }

    fn require_enabled(&self) -> Result<&str, PushApiError> {
        self.vapid_public_key.as_deref().ok_or_else(|| {
            PushApiError(DomainError::new(
                ErrorCode::PushDisabled,
                "Push notifications are not configured on this server",
            ))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/push/vapid-public-key
pub async fn get_vapid_public_key(
    State(state): State<PushAppState>,
) -> Result<impl IntoResponse, PushApiError> {
    let public_key = state.require_enabled()?.to_string();
    Ok(Json(VapidKeyResponse { public_key }))
}

/// POST /api/push/subscribe
pub async fn subscribe(
    State(state): State<PushAppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, PushApiError> {
    state.require_enabled()?;

    let subscriber = Subscriber::try_from(request.subscriber).map_err(DomainError::from)?;
    let cmd = SubscribePushCommand {
        subscriber,
        endpoint: request.subscription.endpoint,
        keys: request.subscription.keys,
    };

    let subscription = state.subscribe_handler().handle(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(subscription)),
    ))
}

/// POST /api/push/unsubscribe
pub async fn unsubscribe(
    State(state): State<PushAppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<impl IntoResponse, PushApiError> {
    let subscriber = Subscriber::try_from(request.subscriber).map_err(DomainError::from)?;
    let cmd = UnsubscribePushCommand {
        subscriber,
        endpoint: request.endpoint,
    };

    state.unsubscribe_handler().handle(cmd).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct PushApiError(DomainError);

impl From<DomainError> for PushApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PushApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
            ErrorCode::SubscriptionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::PushDisabled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::AlreadyAuthenticated | ErrorCode::UnknownConnection => {
                StatusCode::CONFLICT
            }
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                tracing::error!(error = %self.0, "Push API internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = if self.0.details.is_empty() {
            ErrorResponse::new(self.0.code.to_string(), self.0.message)
        } else {
            let details = serde_json::to_value(&self.0.details).unwrap_or_default();
            ErrorResponse::with_details(self.0.code.to_string(), self.0.message, details)
        };

        (status, Json(body)).into_response()
    }
}
