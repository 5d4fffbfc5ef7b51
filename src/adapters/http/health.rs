//! Liveness endpoint with connection counts.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::ports::{ConnectionRegistry, RegistryStats};

#[derive(Clone)]
pub struct HealthState {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub push_enabled: bool,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: RegistryStats,
    pub push_enabled: bool,
}

/// GET /health
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry.stats().await,
        push_enabled: state.push_enabled,
    })
}

pub fn health_router() -> Router<HealthState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::{ChannelTransport, InMemoryConnectionRegistry};
    use crate::domain::foundation::UserId;
    use crate::domain::realtime::StaffRole;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_connection_counts() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (staff, _staff_rx) = ChannelTransport::channel();
        let (anon, _anon_rx) = ChannelTransport::channel();
        let staff_id = registry.accept(staff).await;
        registry.accept(anon).await;
        registry
            .authenticate(&staff_id, UserId::new(1).unwrap(), StaffRole::Manager)
            .await
            .unwrap();

        let app = health_router().with_state(HealthState {
            registry,
            push_enabled: false,
        });
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"]["total"], 2);
        assert_eq!(json["connections"]["staff"], 1);
        assert_eq!(json["pushEnabled"], false);
    }
}
