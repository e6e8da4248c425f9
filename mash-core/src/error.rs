//! Error types shared across the MASH world runtime: validation,
//! authorisation, lookup, policy, state.

use thiserror::Error;

/// Entity lookup failed: target missing, void, or destroyed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no entity with id {id}")]
    NotFound { id: String },

    #[error("entity {id} is voided")]
    Voided { id: String },

    #[error("entity {id} is destroyed")]
    Destroyed { id: String },
}

/// Missing/invalid request parameters or malformed DSL syntax.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown op or head: {what}")]
    UnknownSyntax { what: String },
}

/// Missing permission or wrong owner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorisationError {
    #[error("agent lacks '{key}' permission on {target}")]
    Denied { key: String, target: String },

    #[error("agent is not the owner of {target}")]
    NotOwner { target: String },
}

/// AP exhausted, depth exceeded, per-tick budget exceeded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no AP remaining")]
    NoApRemaining,

    #[error("containment depth would exceed the maximum")]
    ContainmentDepthExceeded,

    #[error("per-tick interaction budget exceeded")]
    InteractionBudgetExceeded,

    #[error("per-tick AP purchase cap exceeded")]
    BuyApCapExceeded,
}

/// A state precondition was not met (e.g. "already home").
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("{0}")]
    Conflict(String),
}

/// Master error type aggregating every category above plus the store's own
/// internal-consistency errors.
#[derive(Debug, Clone, Error)]
pub enum MashError {
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("authorisation error: {0}")]
    Authorisation(#[from] AuthorisationError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("store is in an inconsistent state: {0}")]
    StoreInvariant(String),
}

pub type MashResult<T> = Result<T, MashError>;
