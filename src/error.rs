use thiserror::Error;

#[derive(Error, Debug)]
pub enum RollupError {
    #[error("Unknown time range: {0}")]
    UnknownRange(String),

    #[error("No dated transactions loaded: time ranges cannot be resolved")]
    EmptyBatch,

    #[error("Invalid time range '{id}': {details}")]
    InvalidRange { id: String, details: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RollupError>;
