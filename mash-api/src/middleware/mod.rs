//! Middleware modules for the MASH API.
//!
//! - `auth`: bearer-token resolution, applied to `/poll`, `/wait`, `/action/*`
//! - `rate_limit`: per-IP limiter, applied to `/auth/signup`, `/auth/login`

mod auth;
mod rate_limit;

pub use auth::{auth_middleware, AuthContext};
pub use rate_limit::{rate_limit_middleware, RateLimitState};
