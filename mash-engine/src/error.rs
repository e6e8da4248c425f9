//! Action-level error taxonomy.
//!
//! The tick engine never lets one of these escape a single queued action:
//! `mash_engine::tick::run_tick` catches `ActionError` at the per-entry
//! boundary and folds it into `{error}` on the resulting `action_result`
//! event — exceptions never propagate past a single queued action.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] mash_core::ValidationError),

    #[error(transparent)]
    Authorisation(#[from] mash_core::AuthorisationError),

    #[error(transparent)]
    Lookup(#[from] mash_core::LookupError),

    #[error(transparent)]
    Policy(#[from] mash_core::PolicyError),

    #[error(transparent)]
    State(#[from] mash_core::StateError),
}

impl ActionError {
    pub fn validation(reason: impl Into<String>) -> Self {
        mash_core::ValidationError::InvalidValue { field: "request".into(), reason: reason.into() }.into()
    }

    pub fn missing(field: &str) -> Self {
        mash_core::ValidationError::RequiredFieldMissing { field: field.into() }.into()
    }

    pub fn denied(key: &str, target: impl std::fmt::Display) -> Self {
        mash_core::AuthorisationError::Denied { key: key.into(), target: target.to_string() }.into()
    }

    pub fn not_found(id: impl std::fmt::Display) -> Self {
        mash_core::LookupError::NotFound { id: id.to_string() }.into()
    }

    pub fn voided(id: impl std::fmt::Display) -> Self {
        mash_core::LookupError::Voided { id: id.to_string() }.into()
    }

    /// The message this error surfaces as `result.error` / `{error}` for
    /// everything that returns HTTP 200 with a domain-level failure body.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

/// Lets a queued/instant handler's `ActionError` be returned directly from a
/// `WorldStore::transaction` closure, which expects `mash_core::MashResult`.
impl From<ActionError> for mash_core::MashError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Validation(e) => e.into(),
            ActionError::Authorisation(e) => e.into(),
            ActionError::Lookup(e) => e.into(),
            ActionError::Policy(e) => e.into(),
            ActionError::State(e) => e.into(),
        }
    }
}
