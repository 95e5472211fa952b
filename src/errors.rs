use thiserror::Error;

/// Errors surfaced by collaborator ports and application services.
///
/// Failures inside a macro pass (invalid transitions, action failures,
/// unreachable collaborators) are recovered by the engine and recorded as
/// execution outcomes instead; this type covers everything else.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
