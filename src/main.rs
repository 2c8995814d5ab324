use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use life_dashboard_api::config::Config;
use life_dashboard_api::db::Database;
use life_dashboard_api::db_storage::PgRecordStore;
use life_dashboard_api::handlers::{self, AppState};
use life_dashboard_api::memory_storage::MemoryRecordStore;
use life_dashboard_api::routes;
use life_dashboard_api::storage::RecordStore;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Record store (Postgres with migrations, or in-memory in local mode).
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "life_dashboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let store: Arc<dyn RecordStore> = match config.database_url {
        Some(ref url) => {
            let db = Database::new(url, config.db_max_connections).await?;
            tracing::info!("Database connection pool established");
            Arc::new(PgRecordStore::new(db.pool))
        }
        None => {
            tracing::warn!("Using in-memory record store; data is lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
    };

    let app_state = Arc::new(AppState::new(store, config.clone()));

    // Configure per-IP rate limiter
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    // API routes with security layers
    let protected_routes = routes::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 5MB max payload (history imports are small)
            .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", axum::routing::get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
