use thiserror::Error;

/// Infrastructure faults raised by repositories and adapters. Expected
/// business conditions are modelled by the per-service error enums instead.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<cohort_model::ModelError> for CoreError {
    fn from(err: cohort_model::ModelError) -> Self {
        CoreError::CorruptRecord(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
