use thiserror::Error;

/// BookBot client errors
#[derive(Error, Debug)]
pub enum BookbotError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Backend Error: {error}")]
    BackendError {
        error: String,
        details: Option<String>,
    },

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Storage Error: {0}")]
    StorageError(String),

    #[error("Voice Error: {0}")]
    VoiceError(String),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Result type for BookBot operations
pub type BookbotResult<T> = Result<T, BookbotError>;
