mod archive;
mod circuit_breaker;
mod config;
mod db;
mod errors;
mod handlers;
mod intake;
mod models;
mod notifier;
mod revenue;
mod rollup;
mod storage;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::archive::JsonFileArchive;
use crate::config::Config;
use crate::db::Database;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool, the in-process
/// caches, the inspection archive, and the optional notification gateway,
/// then serves the Axum router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cleanops_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Duplicate-submission cache for the public booking form
    // 5 minute TTL covers the double-click / double-POST window
    let recent_booking_cache = Cache::builder()
        .time_to_live(Duration::from_secs(300))
        .max_capacity(10_000)
        .build();
    tracing::info!("Booking deduplication cache initialized");

    // Customer rollup cache; booking writes invalidate it, the TTL bounds
    // staleness for out-of-band writes
    let summary_cache = Cache::builder()
        .time_to_live(Duration::from_secs(30))
        .max_capacity(4)
        .build();
    tracing::info!("Customer rollup cache initialized (30s TTL)");

    // Inspection archive
    let inspection_archive = Arc::new(JsonFileArchive::new(&config.inspection_archive_path));
    tracing::info!(
        "Inspection archive at {}",
        config.inspection_archive_path
    );

    // Optional notification gateway
    let notifier = match (&config.notify_gateway_url, &config.notify_gateway_token) {
        (Some(url), Some(token)) => {
            match notifier::NotificationGateway::new(url.clone(), token.clone()) {
                Ok(client) => {
                    tracing::info!("Notification gateway client initialized: {}", url);
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!("Failed to initialize notification gateway: {}", e);
                    None
                }
            }
        }
        (Some(_), None) => {
            tracing::warn!("NOTIFY_GATEWAY_URL set without NOTIFY_GATEWAY_TOKEN - notifications disabled");
            None
        }
        _ => None,
    };

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        db: db.pool.clone(),
        config: config.clone(),
        notifier,
        recent_booking_cache,
        summary_cache,
        archive: inspection_archive,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build API routes with security layers
    let api_routes = Router::new()
        // Public booking surface
        .route("/api/v1/bookings", post(handlers::create_booking))
        .route("/api/v1/services", get(handlers::list_services))
        // Bookings (admin)
        .route("/api/v1/bookings", get(handlers::list_bookings))
        .route("/api/v1/bookings/:id", get(handlers::get_booking))
        .route(
            "/api/v1/bookings/:id/status",
            patch(handlers::update_booking_status),
        )
        // Customer rollup
        .route("/api/v1/customers", get(handlers::list_customers))
        .route(
            "/api/v1/customers/lookup",
            get(handlers::lookup_customer),
        )
        // Catalog & staff
        .route("/api/v1/services", post(handlers::create_service))
        .route("/api/v1/services/:id", put(handlers::update_service))
        .route(
            "/api/v1/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route("/api/v1/employees/:id", put(handlers::update_employee))
        // Stocks & vendors
        .route(
            "/api/v1/stocks",
            get(handlers::list_stocks).post(handlers::create_stock_item),
        )
        .route(
            "/api/v1/stocks/:id/quantity",
            patch(handlers::adjust_stock_quantity),
        )
        .route(
            "/api/v1/vendors",
            get(handlers::list_vendors).post(handlers::create_vendor),
        )
        .route("/api/v1/vendors/:id", put(handlers::update_vendor))
        // Inspections (archive-backed)
        .route(
            "/api/v1/inspections",
            get(handlers::list_inspections).post(handlers::create_inspection),
        )
        .route(
            "/api/v1/inspections/:id/status",
            patch(handlers::update_inspection_status),
        )
        // Revenue
        .route("/api/v1/revenue/monthly", get(handlers::monthly_revenue))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check outside the rate limiter
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
