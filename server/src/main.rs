//! Postboard Server - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use postboard_server::db::{self, MemoryStore, PgStore, Store};
use postboard_server::{api, config, permissions::RolesConfig, users};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postboard_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Postboard Server"
    );

    // Role structure
    let roles = match &config.roles_config_path {
        Some(path) => RolesConfig::load(path)
            .with_context(|| format!("Failed to load roles from {path}"))?,
        None => RolesConfig::default(),
    };

    // Initialize storage
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store. Data is lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    let seeded = store.seed_roles(&roles).await?;
    info!(roles = seeded.len(), "Roles seeded");

    // User events
    let (events, receiver) = users::events::channel();
    users::events::spawn_event_logger(receiver);

    // Build application state and router
    let state = api::AppState::new(store, config.clone(), roles, events);
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server shutdown complete");

    Ok(())
}
