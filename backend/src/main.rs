use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wheel_backend::config::ServerConfig;
use wheel_backend::participants::load_registry;
use wheel_backend::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;

    // No spins are accepted without a usable participant list.
    let registry = load_registry(&config.participants_path)
        .await
        .with_context(|| format!("loading participants from {}", config.participants_path.display()))?;
    info!(
        participants = registry.participants().len(),
        total_weight = registry.total_weight(),
        "participants loaded"
    );

    let state = AppState::new(registry, config.broadcast_capacity);
    state.spawn_clock_tick(config.clock_interval);

    let listener = tokio::net::TcpListener::bind((config.bind_address, config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.bind_address, config.port))?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
