use hcs_types::TypeError;
use thiserror::Error;

use crate::statement::StatementKind;

/// Errors from session management and statement execution.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invalid or missing configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS material could not be read or parsed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The initial session could not be established.
    #[error("failed to connect to [{hosts}]: {reason}")]
    Connect { hosts: String, reason: String },

    /// The store rejected or failed a statement.
    #[error("{kind} failed: {message}")]
    Store { kind: StatementKind, message: String },

    /// The store returned a result shape the statement cannot produce.
    #[error("unexpected result: expected {expected}, got {got}")]
    UnexpectedResult {
        expected: &'static str,
        got: &'static str,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// The session has been shut down.
    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// `true` for errors caused by the caller giving up, not by the store.
    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionError::Cancelled | SessionError::DeadlineExceeded)
    }
}

impl From<TypeError> for SessionError {
    fn from(err: TypeError) -> Self {
        SessionError::Config(err.to_string())
    }
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
