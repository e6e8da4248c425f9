//! `/poll` — `{}` in, envelope (events via the bus) out. A non-blocking
//! read of whatever is already queued for the caller; `/wait` is the
//! blocking counterpart.

use axum::{extract::State, routing::post, Extension, Json, Router};
use mash_engine::envelope::{build_response, Envelope};

use crate::middleware::AuthContext;
use crate::state::AppState;

async fn poll(State(state): State<AppState>, Extension(auth): Extension<AuthContext>) -> Json<Envelope> {
    let envelope = state
        .store
        .transaction(|world| Ok(build_response(world, &state.config, auth.agent_id, serde_json::json!({}))))
        .expect("poll never fails");
    Json(envelope)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/poll", post(poll))
}
