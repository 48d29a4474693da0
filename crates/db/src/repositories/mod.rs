use switchboard_core::errors::PersistenceError;
use thiserror::Error;

pub mod handoff;

pub use handoff::SqlHandoffRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for PersistenceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Encode(message) => Self::Encode(message),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}
