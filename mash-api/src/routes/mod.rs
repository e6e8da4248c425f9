//! HTTP route modules, one per surface group.

pub mod action;
pub mod auth;
pub mod health;
pub mod poll;
pub mod wait;

use std::sync::Arc;

use axum::{middleware, Router};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, rate_limit_middleware, RateLimitState};
use crate::state::AppState;

/// Assemble the full router: `/health` open, auth routes behind the per-IP
/// limiter, and `/poll`/`/wait`/`/action/:verb` behind bearer auth.
///
/// Middleware is applied outermost-last: auth runs innermost on the
/// protected routes, the rate limiter wraps only the two auth routes.
pub fn create_api_router(state: AppState, api_config: Arc<ApiConfig>) -> Router {
    let protected = Router::new()
        .merge(poll::router())
        .merge(wait::router())
        .merge(action::router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let rate_limit_state = RateLimitState::new(api_config);
    let unauthenticated_auth_routes = auth::router()
        .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware));

    Router::new()
        .merge(health::router())
        .merge(unauthenticated_auth_routes)
        .merge(protected)
        .with_state(state)
}
