//! MASH API - axum HTTP Transport
//!
//! Exposes the world runtime (`mash-engine`/`mash-store`) over the HTTP
//! surface. Account auth mechanics, per-IP rate limiting, and the
//! tick-interval background task all live here; `mash-engine` never depends
//! on this crate.

pub mod config;
pub mod error;
mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;
