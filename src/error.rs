//! Error types and handling for Gridwatch
//!
//! This module defines the error types used throughout the aggregation layer.
//! Most of them never reach a caller: the scheduler and the historical
//! aggregator absorb them and fall back to synthetic data.

use thiserror::Error;

/// Result type alias for Gridwatch operations
pub type Result<T> = std::result::Result<T, GridwatchError>;

/// Main error type for Gridwatch
#[derive(Debug, Error)]
pub enum GridwatchError {
    /// Missing credential or unusable configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Upstream API answered with a non-success status or a malformed envelope
    #[error("Upstream error ({status_code}): {body}")]
    Upstream { status_code: u16, body: String },

    /// A record value could not be coerced into a number
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Transport-level failures (DNS, TLS, connection reset, timeout)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl GridwatchError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new upstream error from a status code and response body
    pub fn upstream<S: Into<String>>(status_code: u16, body: S) -> Self {
        Self::Upstream {
            status_code,
            body: body.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the error stems from a missing credential (expected operating mode)
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<std::io::Error> for GridwatchError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for GridwatchError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GridwatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for GridwatchError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<chrono::ParseError> for GridwatchError {
    fn from(err: chrono::ParseError) -> Self {
        Self::validation("datetime", err.to_string().as_str())
    }
}
