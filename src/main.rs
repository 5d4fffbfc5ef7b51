use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use taproom_realtime::adapters::push::{
    InMemorySubscriptionStore, PostgresSubscriptionStore, WebPushSender,
};
use taproom_realtime::adapters::websocket::Heartbeat;
use taproom_realtime::app::{cors_layer, RealtimeServices};
use taproom_realtime::config::{AppConfig, DatabaseConfig};
use taproom_realtime::domain::realtime::GOING_AWAY;
use taproom_realtime::ports::{ConnectionRegistry, PushSender, SubscriptionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        "Taproom realtime v{} starting ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.server.environment
    );

    let store = subscription_store(config.database.as_ref()).await?;

    let push = match (&config.push.vapid_public_key, config.push.is_enabled()) {
        (Some(public_key), true) => {
            let sender: Arc<dyn PushSender> = Arc::new(WebPushSender::from_config(&config.push)?);
            tracing::info!("Web push fallback enabled");
            Some((sender, public_key.clone()))
        }
        _ => {
            tracing::warn!("VAPID keys not configured; push fallback disabled");
            None
        }
    };

    let services = RealtimeServices::new(store, push, Heartbeat::from_config(&config.realtime));
    let app = services
        .router()
        .layer(cors_layer(&config.server.cors_origins_list()));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    let registry = services.registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
}

async fn subscription_store(
    database: Option<&DatabaseConfig>,
) -> Result<Arc<dyn SubscriptionStore>, Box<dyn std::error::Error>> {
    let Some(database) = database else {
        tracing::warn!("No database configured; push subscriptions are kept in memory");
        return Ok(Arc::new(InMemorySubscriptionStore::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(&database.url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Arc::new(PostgresSubscriptionStore::new(pool)))
}

/// Waits for Ctrl-C or SIGTERM, then closes every live socket with 1001 so
/// clients reconnect to the next instance.
async fn shutdown_signal(registry: Arc<dyn ConnectionRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drained = registry.drain(GOING_AWAY, "server shutting down").await;
    tracing::info!(drained, "Shutdown signal received, live connections drained");
}
