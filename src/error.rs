//! Error types for the initializer service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for initializer operations
#[derive(Debug, Error)]
pub enum InitializerError {
    /// The requested template path is malformed or names no template.
    ///
    /// The offending path is kept for logging only and never echoed back.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A file or directory the request depends on does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller-supplied parameter was rejected
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the parameter
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Cloud metadata lookups were requested but no credentials are configured
    #[error("Cloud metadata client is not configured")]
    CloudNotConfigured,

    /// The cloud metadata API answered with a non-success status
    #[error("Unexpected HTTP status code: {status} {body}")]
    Upstream {
        /// Status returned by the API
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Transport failure talking to the cloud metadata API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed `{}` path template passed to the cloud client
    #[error("Invalid path template {template}: {reason}")]
    PathTemplate {
        /// The template string
        template: String,
        /// What was wrong with it
        reason: String,
    },

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal failed
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template compilation or rendering failed, including undefined placeholders
    #[error("Template error in {entry}: {source}")]
    Template {
        /// Archive entry being rendered
        entry: String,
        /// Underlying tera error
        #[source]
        source: tera::Error,
    },

    /// Writing the ZIP stream failed
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias using InitializerError
pub type Result<T> = std::result::Result<T, InitializerError>;

impl InitializerError {
    /// Shorthand for an [`InitializerError::InvalidParameter`]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        InitializerError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            InitializerError::TemplateNotFound(_) | InitializerError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            InitializerError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            InitializerError::CloudNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            InitializerError::Upstream { .. } | InitializerError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InitializerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            InitializerError::TemplateNotFound(_) | InitializerError::NotFound(_) => {
                "Not found".to_string()
            }
            InitializerError::InvalidParameter { .. } | InitializerError::CloudNotConfigured => {
                self.to_string()
            }
            InitializerError::Upstream { status, .. } => {
                format!("Cloud API returned status {}", status)
            }
            InitializerError::Http(_) => "Cloud API unreachable".to_string(),
            _ => "Internal server error".to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, message).into_response()
    }
}
