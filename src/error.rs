use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] csv::Error),

    #[error("Browser automation error: {0}")]
    BrowserError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Action unavailable: {0}")]
    ActionUnavailable(String),

    #[error("Navigation to {url} timed out after {secs}s")]
    NavigationTimeout { url: String, secs: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        AppError::BrowserError(err.to_string())
    }

    /// Errors that invalidate every later operation in the run and must not be
    /// swallowed at block, card or profile scope.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::AuthError(_) | AppError::SessionExpired(_))
    }
}
