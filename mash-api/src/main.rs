//! MASH API Server Entry Point
//!
//! Bootstraps the world store and tick engine, then starts the axum HTTP
//! server. The tick loop runs as a background task on a fixed interval,
//! independent of request traffic.

use std::net::SocketAddr;
use std::sync::Arc;

use mash_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};
use mash_core::WorldConfig;
use mash_engine::WaiterSet;
use mash_store::WorldStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let world_config = Arc::new(WorldConfig::from_env());
    let api_config = Arc::new(ApiConfig::from_env());

    let store = Arc::new(WorldStore::new());
    let waiters = Arc::new(WaiterSet::new());
    let state = AppState::new(store.clone(), world_config.clone(), waiters.clone());

    spawn_tick_loop(store, world_config, waiters);

    let app = create_api_router(state, api_config.clone());

    let addr: SocketAddr = api_config
        .bind_addr()
        .parse()
        .map_err(|e| ApiError::internal_error(format!("invalid bind address {}: {e}", api_config.bind_addr())))?;

    tracing::info!(%addr, "starting MASH API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("failed to bind {addr}: {e}")))?;

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

/// Spawn a `tokio::time::interval`-driven background task that calls
/// `mash_engine::tick::run_tick` every `tick_interval_ms`. Production runs
/// the tick engine this way; tests call `run_tick` directly instead.
fn spawn_tick_loop(store: Arc<WorldStore>, config: Arc<WorldConfig>, waiters: Arc<WaiterSet>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(config.tick_interval_ms));
        loop {
            interval.tick().await;
            mash_engine::tick::run_tick(&store, &config, &waiters);
        }
    });
}
