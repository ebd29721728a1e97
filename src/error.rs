//! Error handling and custom error types
//!
//! Provides unified error handling across the service using thiserror. Every
//! variant maps to exactly one HTTP status and one client-facing message; the
//! detail carried by a variant is for logs only.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Image is required")]
    MissingImage,

    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    /// The inbound body could not be read (too large, or the connection failed).
    #[error("Request body rejected: {message}")]
    RequestBody { status: u16, message: String },

    #[error("AI service not configured")]
    NotConfigured,

    #[error("Upstream rate limit exceeded")]
    RateLimited,

    #[error("Upstream usage quota exceeded")]
    QuotaExceeded,

    #[error("Upstream API error (status {status})")]
    Upstream { status: u16 },

    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        Error::RequestBody {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        }
    }
}

impl Error {
    /// HTTP status returned to the caller for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingImage | Error::InvalidImage(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
            Error::RequestBody { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    ///
    /// Upstream details are never echoed; only unexpected failures pass their
    /// own message through.
    pub fn client_message(&self) -> String {
        match self {
            Error::MissingImage => "Image is required".to_string(),
            Error::InvalidImage(_) => "Invalid image data".to_string(),
            Error::NotConfigured => "AI service not configured".to_string(),
            Error::RateLimited => "Rate limit exceeded. Please try again in a moment.".to_string(),
            Error::QuotaExceeded => "Usage limit reached. Please check your account.".to_string(),
            Error::Upstream { .. } | Error::MalformedUpstreamResponse(_) | Error::Http(_) => {
                "Failed to analyze plant".to_string()
            }
            Error::RequestBody { message, .. } => message.clone(),
            Error::Serialization(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}
