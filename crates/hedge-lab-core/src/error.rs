use thiserror::Error;

#[derive(Debug, Error)]
pub enum HedgeError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for HedgeError {
    fn from(e: serde_json::Error) -> Self {
        HedgeError::SerializationError(e.to_string())
    }
}

impl From<chrono::ParseError> for HedgeError {
    fn from(e: chrono::ParseError) -> Self {
        HedgeError::DateError(e.to_string())
    }
}
