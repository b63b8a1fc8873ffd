use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    // Transport errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Status-driven errors signalled by the server
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    #[error("Request failed (HTTP {status}): {message}")]
    Request { status: u16, message: String },

    // Errors raised before any request is issued
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    /// Text suitable for a user-facing banner. Transport details stay in the
    /// logs; the banner only states that the network let us down.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http(_) => "Network error. Please try again.".to_string(),
            ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ApiError::NotFound => "Not found.".to_string(),
            ApiError::Request { message, .. } => message.clone(),
            ApiError::Validation(message) => message.clone(),
            ApiError::Config(message) => message.clone(),
        }
    }
}
