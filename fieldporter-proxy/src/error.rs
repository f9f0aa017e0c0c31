//! Error types for the Fieldporter chat proxy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Proxy error types
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Could not reach the language model API
    #[error("Failed to connect to model API: {0}")]
    UpstreamConnection(String),

    /// The model API answered with a non-success status
    #[error("Model API returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The model API answered, but not with a usable completion
    #[error("Unexpected model API response: {0}")]
    UpstreamFormat(String),

    /// The model call took longer than allowed
    #[error("Model API timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Chat request without a usable message
    #[error("Message is required")]
    MissingMessage,
}

impl ProxyError {
    /// Whether the failure came from the model API rather than our side
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyError::UpstreamConnection(_)
                | ProxyError::UpstreamStatus { .. }
                | ProxyError::UpstreamFormat(_)
                | ProxyError::Timeout(_)
                | ProxyError::Http(_)
        )
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::MissingMessage => StatusCode::BAD_REQUEST,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be between 0 and 1, got {value}")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{name} must be at most {max}, got {value}")]
    TooLarge { name: &'static str, value: u64, max: u64 },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}
