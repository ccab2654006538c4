use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod error;
mod extract;
mod join_code;
mod ledger;
mod middleware;
mod models;
mod repositories;
mod response;
mod routes;
mod services;
mod settings;
mod state;
mod validation;

use common::database::{self, DatabaseConfig, init_pool, run_migrations};

use crate::{
    middleware::{JwtConfig, TokenVerifier},
    repositories::Repositories,
    services::Services,
    settings::AppConfig,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Daret API service");

    let settings = AppConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let jwt_config = JwtConfig::from_env().map_err(|e| anyhow!(e))?;
    let verifier = TokenVerifier::new(&jwt_config)?;

    let app_state = AppState {
        services: Services::new(Repositories::postgres(pool), &settings),
        verifier: Arc::new(verifier),
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = settings.server.address();
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
