//! Transport error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. These are the
//! failures of the remote call itself: the service was never reached, did not
//! answer in time, or answered with something that is not a workflow result.
//! Logical failures reported by the service (`success: false`) are not
//! transport errors and live in `workflow::errors`.

use thiserror::Error;

/// Errors that can occur while talking to the remote workflow service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP/HTTP connection to the workflow endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The workflow endpoint did not respond within the configured timeout.
    #[error("workflow request timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Non-2xx HTTP response from the workflow endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// The endpoint answered 2xx but the body is not a JSON document.
    #[error("invalid response body: {reason}")]
    InvalidResponse {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl TransportError {
    /// Extract the error body text, if this is an `HttpError`.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            TransportError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the service was never reached (connect failure or timeout).
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. }
        )
    }
}
