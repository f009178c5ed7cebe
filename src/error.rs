// src/error.rs

//! Unified error handling for the ratings core.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for ratings operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Remote error code Untappd uses for unknown beers, breweries and venues.
pub const INVALID_RESOURCE: &str = "invalid_resource";

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// API credentials are missing; every operation short-circuits.
    #[error("API not configured.")]
    NotConfigured,

    /// Caller input rejected before any remote call
    #[error("{0}")]
    InvalidInput(String),

    /// The requested resource does not exist remotely
    #[error("{0}")]
    NotFound(String),

    /// Network, TLS or timeout failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Non-2xx status or embedded error code returned by the API
    #[error("API error {http_status} ({code}): {message}")]
    Remote {
        code: String,
        message: String,
        http_status: u16,
    },

    /// Persistence is failing; remote calls are suspended.
    #[error("Cache not working.")]
    CacheUnavailable,

    /// Valid call, nothing to show
    #[error("{0}")]
    EmptyResult(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence backend error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Create a remote API error.
    pub fn remote(code: impl Into<String>, message: impl Into<String>, http_status: u16) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
            http_status,
        }
    }

    /// Create an empty result error.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyResult(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Whether this is a remote error carrying the given machine code.
    ///
    /// Untappd reports some codes with a leading underscore, so both
    /// spellings match.
    pub fn has_remote_code(&self, wanted: &str) -> bool {
        match self {
            Self::Remote { code, .. } => code.trim_start_matches('_') == wanted,
            _ => false,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote { message, code, .. } if message.is_empty() => {
                format!("API not working: {code}")
            }
            Self::Remote { message, .. } => format!("API not working: {message}"),
            Self::Transport { message } => format!("API not working: {message}"),
            other => other.to_string(),
        }
    }

    /// Structured `{"error": ...}` payload for callers.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.user_message(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::transport(format!("request timed out: {error}"))
        } else {
            Self::transport(error)
        }
    }
}

/// Error shape handed to the surrounding layer instead of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

impl From<AppError> for ErrorPayload {
    fn from(error: AppError) -> Self {
        error.to_payload()
    }
}
