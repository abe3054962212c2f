use color_eyre::eyre;
use dockboard_inventory::{CliInspector, DataDir};
use dockboard_server::{create_app, AppState, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,dockboard_server=debug,dockboard_inventory=debug";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        data_dir = %config.data_dir.display(),
        runtime = %config.inspector.binary,
        refresh_period = ?config.refresh_period,
        "Starting dockboard"
    );

    let data = DataDir::new(&config.data_dir);
    let inspector = Arc::new(CliInspector::new(config.inspector.clone()));
    let state = AppState::open(&data, inspector).await?;

    let refresher = state.cache.start(config.refresh_period);
    let requests = state.requests.clone();
    let app = create_app(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dockboard API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.stop().await;
    if let Err(e) = requests.flush().await {
        warn!(error = %e, "Failed to persist request counts on shutdown");
    }
    info!("Dockboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
