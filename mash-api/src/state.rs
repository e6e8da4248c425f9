//! Shared application state injected into every route via axum's `State`.

use std::sync::Arc;
use std::time::Instant;

use mash_core::WorldConfig;
use mash_engine::WaiterSet;
use mash_store::WorldStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<WorldStore>,
    pub config: Arc<WorldConfig>,
    pub waiters: Arc<WaiterSet>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<WorldStore>, config: Arc<WorldConfig>, waiters: Arc<WaiterSet>) -> Self {
        Self { store, config, waiters, started_at: Instant::now() }
    }
}
