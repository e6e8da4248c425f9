use thiserror::Error;

/// Parse-time failures for the Interaction DSL's JSON tuple encoding.
/// Always maps onto `mash_core::ValidationError::UnknownSyntax` at the edge —
/// a malformed rule is a validation failure, never a panic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DslError {
    #[error("reference has no head: '{0}'")]
    EmptyReference(String),

    #[error("unknown reference head '{0}' in '{1}'")]
    UnknownHead(String, String),

    #[error("malformed reference '{0}': {1}")]
    MalformedReference(String, &'static str),

    #[error("unknown op '{0}'")]
    UnknownOp(String),

    #[error("expected {what} to be {expected}")]
    TypeMismatch { what: String, expected: &'static str },

    #[error("required field missing: {0}")]
    MissingField(&'static str),

    #[error("empty tuple")]
    EmptyTuple,
}

impl From<DslError> for mash_core::MashError {
    fn from(e: DslError) -> Self {
        mash_core::ValidationError::UnknownSyntax { what: e.to_string() }.into()
    }
}

pub type DslResult<T> = Result<T, DslError>;
