//! # TaskDesk API Server
//!
//! REST API for users and tasks with JWT authentication.
//!
//! ## Usage
//!
//! ```bash
//! JWT_ACCESS_SECRET=... JWT_REFRESH_SECRET=... cargo run -p taskdesk-api
//! ```
//!
//! Without `DATABASE_URL` the server runs on the in-memory store.

use taskdesk_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use taskdesk_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.api.environment,
        "TaskDesk API Server starting..."
    );

    let bind_address = config.bind_address();

    let (state, pool) = match config.database.clone() {
        Some(db) => {
            if !config.api.is_production() {
                ensure_database_exists(&db.url).await?;
            }
            let pool = create_pool(DatabaseConfig {
                url: db.url,
                max_connections: db.max_connections,
                ..Default::default()
            })
            .await?;
            run_migrations(&pool).await?;
            tracing::info!("Using PostgreSQL store");
            (AppState::postgres(pool.clone(), config), Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
            (AppState::in_memory(config), None)
        }
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(&pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskdesk_api=debug,taskdesk_shared=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
