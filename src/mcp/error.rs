//! Error types for the BambooHR MCP implementation.
//!
//! This module contains the single error type shared by the HTTP client layer
//! and the tools. It provides:
//! - `BambooHrError`: every failure a request can end in, already normalized
//!   into a self-contained, secret-free message
//! - Conversion to RMCP's `ErrorData` for MCP protocol compliance

use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BambooHrError {
    #[error("Request timeout after {seconds} seconds: {endpoint}")]
    Timeout { endpoint: String, seconds: f64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    RateLimited { status: u16, message: String },

    #[error("{message}")]
    ServerError { status: u16, message: String },

    #[error("{message}")]
    ClientError { status: u16, message: String },

    #[error("{0}")]
    MalformedResponse(String),

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("Image too large to inline: {size} bytes exceeds the {max} byte limit")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BambooHrError {
    /// HTTP status of the failed response, when the failure came from one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status, .. }
            | Self::ServerError { status, .. }
            | Self::ClientError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is transient, i.e. the retry controller would try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::Timeout { .. } => true,
            Self::Network(message) => crate::mcp::http::is_retryable_network_message(message),
            _ => false,
        }
    }

    /// Scrubs every occurrence of `secret` from the error's text.
    #[must_use]
    pub fn redacted(self, secret: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        let scrub = |text: String| text.replace(secret, "<redacted>");
        match self {
            Self::Timeout { endpoint, seconds } => Self::Timeout {
                endpoint: scrub(endpoint),
                seconds,
            },
            Self::Network(message) => Self::Network(scrub(message)),
            Self::RateLimited { status, message } => Self::RateLimited {
                status,
                message: scrub(message),
            },
            Self::ServerError { status, message } => Self::ServerError {
                status,
                message: scrub(message),
            },
            Self::ClientError { status, message } => Self::ClientError {
                status,
                message: scrub(message),
            },
            Self::MalformedResponse(message) => Self::MalformedResponse(scrub(message)),
            Self::InvalidImageData(message) => Self::InvalidImageData(scrub(message)),
            other => other,
        }
    }
}

impl From<BambooHrError> for ErrorData {
    fn from(err: BambooHrError) -> Self {
        match err {
            BambooHrError::InvalidParams(msg) => Self::new(ErrorCode::INVALID_PARAMS, msg, None),
            other => Self::new(ErrorCode::INTERNAL_ERROR, other.to_string(), None),
        }
    }
}
