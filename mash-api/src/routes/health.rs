//! `GET /health`: `{status:"ok", tick_number, uptime}`. No auth, no
//! database to probe — the world's own lock standing uncontended is the
//! liveness signal.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tick_number: u64,
    pub uptime_seconds: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let tick_number = state.store.read(|world| world.world_state.tick_number);
    Json(HealthResponse {
        status: "ok",
        tick_number,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let response = HealthResponse { status: "ok", tick_number: 3, uptime_seconds: 42 };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["tick_number"], 3);
    }
}
