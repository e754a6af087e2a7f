//! Error types for progress operations.

/// Error type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors returned by store and step operations.
///
/// Validation and misuse errors are always returned to the caller. Internal
/// invariant violations are not represented here: they abort the offending
/// call with a panic.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// A step id must not be empty
    #[error("step requires a non-empty id")]
    EmptyId,

    /// A step with this id already exists in the store
    #[error("step id must be unique, '{0}' is already registered")]
    DuplicateId(String),

    /// The step was already started or is in progress
    #[error("cannot start step '{0}': already in progress")]
    AlreadyStarted(String),

    /// The step is already done
    #[error("step '{0}' is already done")]
    AlreadyDone(String),

    /// Attached data could not be converted to JSON
    #[error("JSON error: {0}")]
    Data(#[from] serde_json::Error),
}
