use kitchenflow_core::DomainError;
use thiserror::Error;

/// A remote read failed.
///
/// Inside a polling tick this is logged and swallowed; subscribers keep the
/// last-known snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("subject not found")]
    NotFound,
    #[error("fetch timed out")]
    Timeout,
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Whether a cached snapshot may stand in for this failure.
    ///
    /// `NotFound` is an answer from the remote, not a failure to reach it.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::NotFound | FetchError::Parse(_))
    }
}

/// Error returned by tracker/monitor operations that combine a local domain
/// step with a remote call.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
