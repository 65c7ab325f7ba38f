//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod version_guard;

use axum::{
    Json, Router, http,
    http::{Method, header},
    middleware,
    routing::get,
};
use identity::domain::repository::VerificationTokenStore;
use identity::{IdentityAppState, IdentityConfig, PgIdentityRepository, identity_router};
use platform::client::{MAC_ADDRESS_HEADER, VERSION_HEADER};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

use crate::version_guard::version_guard;

/// Process-level settings read from the environment
struct Settings {
    database_url: String,
    bind_addr: SocketAddr,
    frontend_origins: String,
    api_version: String,
    purge_interval: Duration,
}

impl Settings {
    fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set in environment"))?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
            .parse()?;

        let frontend_origins = env::var("FRONTEND_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

        let api_version = env::var("API_VERSION").unwrap_or_else(|_| "1.0".to_string());

        let purge_interval = match env::var("IDENTITY_TOKEN_PURGE_INTERVAL_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse()?),
            Err(_) => Duration::from_secs(60),
        };

        Ok(Self {
            database_url,
            bind_addr,
            frontend_origins,
            api_version,
            purge_interval,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,identity=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Identity configuration; a random JWT key is only allowed in debug builds
    let identity_config = IdentityConfig::from_env()?;
    let identity_state = IdentityAppState::new(PgIdentityRepository::new(pool), identity_config);

    // Verification codes live in memory; drop expired ones periodically
    let tokens = identity_state.tokens.clone();
    let clock = identity_state.clock.clone();
    let purge_interval = settings.purge_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        loop {
            interval.tick().await;
            let purged = tokens.purge_expired(clock.now());
            if purged > 0 {
                tracing::info!(purged, "Expired verification tokens purged");
            }
        }
    });

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = settings
        .frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            http::HeaderName::from_static(MAC_ADDRESS_HEADER),
            http::HeaderName::from_static(VERSION_HEADER),
        ]))
        .allow_credentials(true);

    // Build router
    let api_version: Arc<str> = Arc::from(settings.api_version.as_str());
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/identity", identity_router(identity_state))
        .layer(middleware::from_fn_with_state(api_version, version_guard))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", settings.bind_addr);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
