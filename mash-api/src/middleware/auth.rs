//! Bearer-token authentication middleware: `Authorization: Bearer <token>`.
//! A single opaque-token provider — account auth internals (signup flows,
//! password hashing, session stores) are out of scope here, so resolving a
//! token to an `AgentId` is the whole job.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mash_core::AgentId;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, injected into request extensions on success.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub agent_id: AgentId,
}

fn extract_bearer(request: &Request) -> Result<&str, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use the Bearer scheme"))
}

/// Resolve the bearer token to an `AgentId` and inject `AuthContext` into
/// the request's extensions. Returns 401 on a missing header or a token
/// that resolves to nothing.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&request)?;

    let agent_id = state
        .store
        .read(|world| world.agent_by_token(token).map(|a| a.id))
        .ok_or_else(|| ApiError::invalid_token("token does not match any agent"))?;

    // Stamp activity and pull the agent out of limbo if a prior tick
    // idle-reaped it: any authenticated request restores presence.
    state.store.transaction(|world| {
        world.mark_active(agent_id);
        Ok(())
    }).map_err(|_| ApiError::internal_error("failed to record activity"))?;

    request.extensions_mut().insert(AuthContext { agent_id });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn extract_bearer_requires_bearer_scheme() {
        let request = HttpRequest::builder()
            .header(axum::http::header::AUTHORIZATION, "Basic abc123")
            .body(Body::empty())
            .unwrap();
        assert!(extract_bearer(&request).is_err());
    }

    #[test]
    fn extract_bearer_strips_prefix() {
        let request = HttpRequest::builder()
            .header(axum::http::header::AUTHORIZATION, "Bearer tok-1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer(&request).unwrap(), "tok-1");
    }
}
