//! Wiring of the realtime services into one axum application.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::http::{health_router, push_router, HealthState, PushAppState};
use crate::adapters::push::DeliveryBridge;
use crate::adapters::websocket::{
    websocket_router, EventRouter, Heartbeat, InMemoryConnectionRegistry, WebSocketState,
};
use crate::ports::{ConnectionRegistry, PushSender, SubscriptionStore};

/// The process-wide services, built once at startup.
#[derive(Clone)]
pub struct RealtimeServices {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub router: Arc<EventRouter>,
    pub subscription_store: Arc<dyn SubscriptionStore>,
    /// Set only when push delivery is configured.
    pub vapid_public_key: Option<String>,
    pub heartbeat: Heartbeat,
}

impl RealtimeServices {
    /// `push` carries the sender and public key when push is enabled.
    pub fn new(
        subscription_store: Arc<dyn SubscriptionStore>,
        push: Option<(Arc<dyn PushSender>, String)>,
        heartbeat: Heartbeat,
    ) -> Self {
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let (bridge, vapid_public_key) = match push {
            Some((sender, public_key)) => (
                Some(Arc::new(DeliveryBridge::new(subscription_store.clone(), sender))),
                Some(public_key),
            ),
            None => (None, None),
        };
        let router = EventRouter::new_shared(registry.clone(), bridge);

        Self {
            registry,
            router,
            subscription_store,
            vapid_public_key,
            heartbeat,
        }
    }

    pub fn push_enabled(&self) -> bool {
        self.vapid_public_key.is_some()
    }

    /// All routes: `/ws`, `/api/push/*` and `/health`.
    pub fn router(&self) -> Router {
        let ws_state = WebSocketState::new(
            self.registry.clone(),
            self.router.clone(),
            self.heartbeat,
        );
        let push_state = PushAppState::new(
            self.subscription_store.clone(),
            self.vapid_public_key.clone(),
        );
        let health_state = HealthState {
            registry: self.registry.clone(),
            push_enabled: self.push_enabled(),
        };

        Router::new()
            .merge(websocket_router().with_state(ws_state))
            .merge(push_router().with_state(push_state))
            .merge(health_router().with_state(health_state))
            .layer(TraceLayer::new_for_http())
    }
}

/// CORS for the push endpoints. An empty list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
