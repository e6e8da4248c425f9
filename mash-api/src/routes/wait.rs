//! `/wait` — blocks until the next tick completes, then returns the
//! envelope. Registers a one-shot waiter, releases the store lock while
//! waiting, and caps the wait at one tick interval so a missed release can
//! never hang a connection forever.

use axum::{extract::State, routing::post, Extension, Json, Router};
use mash_engine::envelope::{build_response, Envelope};

use crate::middleware::AuthContext;
use crate::state::AppState;

async fn wait(State(state): State<AppState>, Extension(auth): Extension<AuthContext>) -> Json<Envelope> {
    let receiver = state.waiters.register();
    let cap = std::time::Duration::from_millis(state.config.tick_interval_ms);
    let _ = tokio::time::timeout(cap, receiver).await;

    let envelope = state
        .store
        .transaction(|world| Ok(build_response(world, &state.config, auth.agent_id, serde_json::json!({}))))
        .expect("wait never fails");
    Json(envelope)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/wait", post(wait))
}
