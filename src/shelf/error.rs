use thiserror::Error;

/// Failures surfaced to the user. Field resolution misses never show up here;
/// the resolver recovers from them locally.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// Persistence rejected a read or write. In-memory state is left as it
    /// was before the failed operation.
    #[error("storage error: {0}")]
    Storage(String),
    /// Imported JSON has the wrong shape. Nothing was applied.
    #[error("format error: {0}")]
    Format(String),
    #[error("no record with id '{0}'")]
    NotFound(String),
    /// A request that refers to something the record does not have.
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl ShelfError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        ShelfError::Storage(err.to_string())
    }

    pub fn format(err: impl std::fmt::Display) -> Self {
        ShelfError::Format(err.to_string())
    }
}
