//! `/auth/signup`, `/auth/login` — the account surface, reduced to its
//! externally-observable contract: a `{username, password}` request
//! resolves to an opaque bearer token. `Agent` carries no password field —
//! password hashing/storage is out of scope for this service, so the
//! password is accepted here for wire-shape fidelity and never persisted
//! or checked. See DESIGN.md "Open Questions".

use axum::{extract::State, routing::post, Json, Router};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    #[allow(dead_code)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub agent_id: String,
    pub token: String,
    pub home_node_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub agent_id: String,
    pub token: String,
}

/// A fresh, opaque 256-bit bearer token, hex-encoded. Not derived from the
/// password — account-auth mechanics are out of scope here, so there is
/// nothing to verify a password against.
fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

async fn signup(State(state): State<AppState>, Json(req): Json<CredentialsRequest>) -> ApiResult<Json<SignupResponse>> {
    if req.username.trim().is_empty() {
        return Err(ApiError::bad_request("username must not be empty"));
    }
    let token = mint_token();

    let agent = state
        .store
        .transaction(|world| mash_engine::signup::signup(world, req.username.clone(), token.clone()).map_err(Into::into))
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    Ok(Json(SignupResponse {
        agent_id: agent.id.to_string(),
        token: agent.token,
        home_node_id: agent.home_node_id.to_string(),
    }))
}

async fn login(State(state): State<AppState>, Json(req): Json<CredentialsRequest>) -> ApiResult<Json<LoginResponse>> {
    let new_token = mint_token();

    let result = state.store.transaction(|world| {
        let Some(agent_id) = world.agent_by_username(&req.username).map(|a| a.id) else {
            return Ok(None);
        };
        world.set_agent_token(agent_id, new_token.clone());
        Ok(Some(agent_id))
    });

    match result {
        Ok(Some(agent_id)) => Ok(Json(LoginResponse { agent_id: agent_id.to_string(), token: new_token })),
        Ok(None) => Err(ApiError::unauthorized("unknown username")),
        Err(_) => Err(ApiError::internal_error("login failed")),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/signup", post(signup)).route("/auth/login", post(login))
}
