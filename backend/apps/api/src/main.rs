//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by the
//! promotion crate.

use axum::{
    Router, http,
    http::{Method, header},
    routing::get,
};
use platform::config::{env_opt, env_or};
use platform::rate_limit::{SlidingWindowLimiter, spawn_sweeper};
use promotion::presentation::handlers::health;
use promotion::{
    AdmissionState, InMemoryPromotionRepository, PgPromotionRepository, PromotionConfig,
    promotion_router, promotion_router_generic,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,promotion=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Promotion configuration
    let promotion_config = PromotionConfig::from_env()?;

    let limiter = SlidingWindowLimiter::new(promotion_config.rate_limit);
    spawn_sweeper(limiter.clone(), promotion_config.sweep_interval);
    let admission = AdmissionState::new(limiter, promotion_config.trust_forwarded_for);

    tracing::info!(
        max_requests = promotion_config.rate_limit.max_requests,
        window_secs = promotion_config.rate_limit.window.as_secs(),
        trust_forwarded_for = promotion_config.trust_forwarded_for,
        "Admission control configured"
    );

    // Promotion store
    let promotions = match env_opt("DATABASE_URL") {
        Some(database_url) => {
            let max_connections: u32 = env_or("DATABASE_MAX_CONNECTIONS", 5)?;

            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            promotion_router(PgPromotionRepository::new(pool), admission)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, promotions are kept in memory only");
            promotion_router_generic(InMemoryPromotionRepository::new(), admission)
        }
    };

    // CORS configuration
    let frontend_origins = env_opt("FRONTEND_ORIGINS")
        .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", promotions)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let port: u16 = env_or("PORT", 8080)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
