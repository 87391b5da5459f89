use hcs_session::SessionError;
use hcs_types::TypeError;
use thiserror::Error;

/// Errors from storage backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Invalid configuration. Only produced at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// The initial session could not be established.
    #[error("connection error: {0}")]
    Connect(String),

    /// The key cannot be stored.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The store failed a statement; the store's own message is preserved.
    #[error("store error: {0}")]
    Store(#[source] SessionError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// The backend has been shut down.
    #[error("backend is closed")]
    Closed,

    /// A [`RetryBackend`](crate::RetryBackend) gave up.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
}

impl BackendError {
    /// `true` when the caller aborted the operation rather than the store
    /// failing it.
    pub fn is_aborted(&self) -> bool {
        matches!(self, BackendError::Cancelled | BackendError::DeadlineExceeded)
    }

    /// `true` for transient store failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Store(_))
    }
}

impl From<SessionError> for BackendError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Config(msg) | SessionError::Tls(msg) => BackendError::Config(msg),
            err @ SessionError::Connect { .. } => BackendError::Connect(err.to_string()),
            SessionError::Cancelled => BackendError::Cancelled,
            SessionError::DeadlineExceeded => BackendError::DeadlineExceeded,
            SessionError::Closed => BackendError::Closed,
            err @ (SessionError::Store { .. } | SessionError::UnexpectedResult { .. }) => {
                BackendError::Store(err)
            }
        }
    }
}

impl From<TypeError> for BackendError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidKey { key, reason } => BackendError::InvalidKey { key, reason },
            other => BackendError::Config(other.to_string()),
        }
    }
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
