use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cvdesk_api::auth::HostedAuthClient;
use cvdesk_api::config::{Config, StoreKind};
use cvdesk_api::db::{create_pool, run_migrations};
use cvdesk_api::repository::Repositories;
use cvdesk_api::routes::build_router;
use cvdesk_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvdesk API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the store
    let repos = match config.store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let db = create_pool(database_url).await?;
            if config.run_migrations {
                run_migrations(&db).await?;
            }
            Repositories::postgres(db)
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Repositories::in_memory()
        }
    };

    // Initialize auth client
    let auth = HostedAuthClient::new(&config.auth_url, config.auth_anon_key.clone())?;
    info!("Auth client initialized ({})", config.auth_url);

    // Build app state
    let state = AppState {
        repos,
        auth: Arc::new(auth),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins to the frontend host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
