//! Error types for vanadristi-core.
//!
//! This module defines every error that can occur when talking to the
//! VanaDristi API, reading the query cache, or acquiring an image.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::NotReachable`] | Retry | Transient network failure |
//! | [`Error::Api`] with 5xx status | Retry | Server hiccup |
//! | [`Error::Api`] with 4xx status | Do not retry | The request itself is wrong |
//! | [`Error::Decode`] | Do not retry | Server contract mismatch |
//! | [`Error::QueryDisabled`] | Do not retry | A required parameter is missing |
//! | [`Error::SubmissionInFlight`] | Wait for the pending request | One submission per mutation handle |
//! | [`Error::Capture`] | Report to user, abort the capture | Camera unavailable or denied |
//! | [`Error::InvalidUrl`] / [`Error::InvalidConfig`] | Do not retry | Fix configuration |
//!
//! Queries opt into retries through [`crate::Query::retry`]; see
//! [`crate::retry`] for the classification. Mutations are never retried.

use thiserror::Error;

use crate::cache::QueryKey;

/// Errors that can occur in the VanaDristi client.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The API server could not be reached.
    #[error("API not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client error that happened outside of sending the request.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The query needs a parameter that was not supplied.
    #[error("Query {key} is disabled: a required parameter is missing")]
    QueryDisabled { key: QueryKey },

    /// The same mutation is already pending.
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    /// Image acquisition failed.
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A server value could not be interpreted.
    #[error(transparent)]
    Parse(#[from] vanadristi_types::ParseError),
}

/// Reasons the camera path can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// No capture device matches the constraints.
    #[error("no camera available")]
    DeviceUnavailable,
    /// The user or platform refused access.
    #[error("permission to use the camera was denied")]
    PermissionDenied,
    /// The stream was already stopped.
    #[error("camera stream is not active")]
    StreamInactive,
    /// The frame could not be turned into an image.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl Error {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// HTTP status of the failure, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the server answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type alias using vanadristi-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::api(500, "boom");
        assert_eq!(err.to_string(), "API error (500): boom");

        let err = Error::QueryDisabled {
            key: QueryKey::new(["plant", ""]),
        };
        assert!(err.to_string().contains("plant"));

        let err = Error::Capture(CaptureError::PermissionDenied);
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_status_helpers() {
        assert!(Error::api(404, "missing").is_not_found());
        assert_eq!(Error::api(503, "down").status(), Some(503));
        assert_eq!(Error::SubmissionInFlight.status(), None);
        assert!(!Error::InvalidUrl("x".into()).is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = vanadristi_types::ParseError::UnknownRoute("/x".into()).into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
