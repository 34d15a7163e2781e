// Initialize configuration
// Set up logging
// Create database connection pool
// Load the address registry and seed account snapshots
// Start the synchronizers
// Start HTTP server

use account_monitor::{api, config::Config, db, node::HttpNodeClient, state::AppState, sync, NodeClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting account-monitor");

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    info!("Database connection established");

    let node: Arc<dyn NodeClient> = Arc::new(HttpNodeClient::new(&config)?);

    // The registry publishes the initial active set before any synchronizer runs
    let app_state = AppState::initialize(config.clone(), db_pool, node).await?;

    let shutdown = CancellationToken::new();
    let mut synchronizers = sync::spawn_synchronizers(&app_state, shutdown.clone());

    let app = api::create_router(app_state.clone());
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    while let Some(result) = synchronizers.join_next().await {
        if let Err(e) = result {
            error!("Synchronizer task failed: {}", e);
        }
    }

    info!("account-monitor stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}
