//! Error types for buildstore.

use thiserror::Error;

/// Failure type shared by the registries and the storage adapter.
///
/// Registry failures travel through the adapter untouched, so this type is
/// `Clone + PartialEq` and callers can compare what they got against what the
/// backend produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unknown parser plugin: {0}")]
    UnknownParser(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
