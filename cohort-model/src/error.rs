use std::fmt::{self, Display};

/// Errors produced by model constructors and parsing routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownStatus { kind: &'static str, value: String },
    InvalidCurrency(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownStatus { kind, value } => {
                write!(f, "unknown {kind} status: {value}")
            }
            ModelError::InvalidCurrency(code) => {
                write!(f, "invalid currency code: {code}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
