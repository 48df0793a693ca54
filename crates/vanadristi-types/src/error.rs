//! Error types for data parsing in vanadristi-types.

use thiserror::Error;

/// Errors that can occur when interpreting values received from the API
/// or typed by the user.
///
/// This error type is transport-agnostic and does not include HTTP
/// errors (those belong in vanadristi-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A server timestamp could not be parsed.
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    /// A path does not name any known view.
    #[error("Unknown route: '{0}'")]
    UnknownRoute(String),
}

/// Result type alias using vanadristi-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
