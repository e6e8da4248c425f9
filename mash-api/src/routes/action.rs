//! `/action/:verb` — instant/queued/free verb dispatch. Result shape is
//! per-verb for instant/free, or the queue-confirmation shape
//! `{queued:true, action_id, tick_number, ap_remaining}` for queued verbs.

use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use mash_engine::actions::{dispatch, ActionOutcome};
use mash_engine::envelope::{build_response, Envelope};
use serde_json::Value as Json2;

use crate::error::{action_error_response, ApiError, ApiResult};
use crate::middleware::AuthContext;
use crate::state::AppState;

async fn action(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(verb): Path<String>,
    Json(params): Json<Json2>,
) -> ApiResult<Json<Envelope>> {
    let result = state.store.transaction(|world| {
        let current_tick = world.world_state.tick_number;
        let dispatched = dispatch(world, &state.config, auth.agent_id, &verb, params, current_tick);
        let payload = match dispatched {
            Ok(outcome) => Ok(match outcome {
                ActionOutcome::Immediate(value) => value,
                ActionOutcome::Queued { action_id, tick_number, ap_remaining } => serde_json::json!({
                    "queued": true,
                    "action_id": action_id.0,
                    "tick_number": tick_number,
                    "ap_remaining": ap_remaining,
                }),
            }),
            Err(action_err) => Err(action_err),
        };
        Ok(match payload {
            Ok(value) => Ok(build_response(world, &state.config, auth.agent_id, value)),
            Err(action_err) => Err(action_err),
        })
    });

    match result {
        Ok(Ok(envelope)) => Ok(Json(envelope)),
        Ok(Err(action_err)) => {
            let body = action_error_response(action_err)?;
            let envelope = state
                .store
                .transaction(|world| Ok(build_response(world, &state.config, auth.agent_id, body)))
                .expect("envelope build never fails");
            Ok(Json(envelope))
        }
        Err(_) => Err(ApiError::internal_error("action dispatch failed")),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/action/:verb", post(action))
}
