//! Transport-level error taxonomy.
//!
//! Only the **transport** category (missing/invalid auth header, malformed
//! JSON) and the **policy** category (AP exhaustion, purchase caps,
//! containment depth, interaction budget) get a real HTTP error status
//! here. Every other domain error (validation, authorisation, lookup,
//! state) is folded into a `200 OK` body shaped `{error: "<reason>"}` by
//! the route handler — it never reaches this type.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or malformed `Authorization` header.
    Unauthorized,
    /// Header present but the token does not resolve to an agent.
    InvalidToken,
    /// Malformed request body.
    BadRequest,
    /// Policy error: AP exhausted, a purchase cap hit, or another
    /// per-tick/per-agent limit exceeded.
    TooManyRequests,
    /// Per-IP auth rate limit exceeded (signup/login only).
    RateLimited,
    /// Anything unexpected; logged server-side, opaque to the caller.
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::TooManyRequests | ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid or unrecognised token",
            ErrorCode::BadRequest => "Malformed request body",
            ErrorCode::TooManyRequests => "Policy limit exceeded",
            ErrorCode::RateLimited => "Rate limit exceeded",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self { code, message: code.default_message().to_string() }
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!("Rate limit exceeded, retry after {retry_after_secs}s"),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

/// A domain error (validation/authorisation/lookup/state — everything that
/// is not transport or policy) folded into the HTTP 200 body
/// `{error: "<reason>"}`.
pub fn domain_error_body(reason: impl fmt::Display) -> serde_json::Value {
    serde_json::json!({"error": reason.to_string()})
}

/// Route a domain-level `ActionError`: the whole policy category (AP
/// exhaustion, purchase cap, containment depth, interaction budget)
/// becomes a real HTTP 429; everything else is `Ok` with
/// `{error: "<reason>"}` as the body, since a failed `look` or a denied
/// `edit` is not a transport failure.
pub fn action_error_response(err: mash_engine::ActionError) -> Result<serde_json::Value, ApiError> {
    if let mash_engine::ActionError::Policy(policy_err) = &err {
        return Err(ApiError::new(ErrorCode::TooManyRequests, policy_err.to_string()));
    }
    Ok(domain_error_body(err.reason()))
}

pub type ApiResult<T> = Result<T, ApiError>;
