//! Error types for the SDK's connection, REST, scanner and config layers

use crate::transport::TransportError;
use tavo_shared::{CodecError, ConnectionState, EndpointError, ErrorResponse};
use thiserror::Error;

/// Errors returned by the connection manager
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("already connected (state: {0})")]
    AlreadyConnected(ConnectionState),

    #[error("not connected")]
    NotConnected,

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to read message: {0}")]
    Read(#[source] TransportError),

    #[error("failed to write message: {0}")]
    Write(#[source] TransportError),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    #[error("invalid connection config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] CodecError),
}

/// Errors returned by the REST layer
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP {status}: {}", error_summary(.body))]
    Status { status: u16, body: ErrorResponse },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn error_summary(body: &ErrorResponse) -> &str {
    if !body.message.is_empty() {
        &body.message
    } else if !body.error.is_empty() {
        &body.error
    } else {
        "request failed"
    }
}

impl ApiError {
    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a retry may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Errors returned by the scanner subprocess wrapper
#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("tavo-scanner binary not found; install tavo-cli or set scanner_path")]
    BinaryNotFound,

    #[error("scanner timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to run scanner: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write scanner config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_prefers_message() {
        let err = ApiError::Status {
            status: 404,
            body: ErrorResponse {
                error: "not_found".into(),
                message: "scan abc not found".into(),
                details: None,
            },
        };
        assert_eq!(err.to_string(), "HTTP 404: scan abc not found");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = ApiError::Status {
            status: 503,
            body: ErrorResponse::default(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "HTTP 503: request failed");
    }

    #[test]
    fn test_connect_error_keeps_cause() {
        let err = ConnectionError::Connect {
            target: "wss://api.example.com/".into(),
            source: TransportError::Closed,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(
            err.to_string(),
            "failed to connect to wss://api.example.com/: connection closed by peer"
        );
    }
}
