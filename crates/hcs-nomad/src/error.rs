use hcs_backend::BackendError;
use thiserror::Error;

/// Errors from reading or writing the Nomad access configuration.
#[derive(Debug, Error)]
pub enum NomadError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("error reading nomad access configuration: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("error encoding nomad access configuration: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type NomadResult<T> = Result<T, NomadError>;
