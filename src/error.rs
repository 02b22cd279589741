//! Error types for the notebook client

use thiserror::Error;

use crate::html::InjectError;

/// Client-wide result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
///
/// Anchor resolution misses are not errors; see [`crate::anchor::Resolution`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Structural conflict: {0}")]
    StructuralConflict(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("HTML error: {0}")]
    Html(#[from] InjectError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether this failure came from talking to the server
    pub fn is_network_failure(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Api { .. })
    }

    /// Message suitable for an inline error state or a notice
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::StructuralConflict(_) => {
                "The selection is too complex. Please select a shorter passage.".to_string()
            }
            ClientError::Api { status: 404, .. } => "The document could not be found".to_string(),
            ClientError::Api { detail, .. } => detail.clone(),
            ClientError::Network(_) => "Could not reach the server".to_string(),
            ClientError::Decode(_) => "The server sent an unexpected response".to_string(),
            ClientError::Html(_) => "The document could not be rendered".to_string(),
            ClientError::Io(_) => "A local storage error occurred".to_string(),
        }
    }
}
