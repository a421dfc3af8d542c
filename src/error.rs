use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum SensorError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("{0}")]
    Transport(String),

    #[error("Got http error code {0}")]
    HttpStatus(u16),

    /// Root cause is kept as the source so callers only see a generic message.
    #[error("pattern error")]
    Extraction(#[source] ExtractError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Failure to pull a token out of a response body.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Reg Ex pattern didn't match anything")]
    PatternMismatch,

    #[error("Reg Ex pattern has no group at index {index} (pattern has {groups} groups)")]
    InvalidGroup { index: usize, groups: usize },
}

impl From<ExtractError> for SensorError {
    fn from(err: ExtractError) -> Self {
        SensorError::Extraction(err)
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;
