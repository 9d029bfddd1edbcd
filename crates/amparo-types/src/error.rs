//! Error taxonomy shared by every core operation.
//!
//! Aborted operations leave all state unmodified and carry a message naming
//! the violated invariant, so callers can self-correct instead of retrying
//! blindly. Rule-evaluator failures are NOT represented here — the
//! automation engine recovers them locally and reports them as data.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Case/referral/task/rule id does not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing required field, malformed stage/status target, bad deadline.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Operation illegal in the entity's current state.
    #[error("state error: {0}")]
    State(String),

    /// Actor lacks capability for the target scope.
    #[error("scope error: {0}")]
    Scope(String),

    /// Collaborator/storage failure.
    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {}", entity, id))
    }

    /// HTTP status the thin transport wrapper should map this to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::State(_) => 409,
            Self::Scope(_) => 403,
            Self::Internal(_) => 500,
        }
    }
}
