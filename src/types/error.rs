//! Error types for Perkhub
//!
//! Crate-wide error used by configuration, database bootstrap and the auth
//! helpers. Claim decisions use their own `ClaimError` (see `claims`), and
//! store backends report `StoreError` (see `store`).

/// Main error type for Perkhub operations
#[derive(Debug, thiserror::Error)]
pub enum PerkhubError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl From<std::io::Error> for PerkhubError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PerkhubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for PerkhubError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for PerkhubError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for PerkhubError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("JWT error: {}", err))
    }
}

/// Result type alias for Perkhub operations
pub type Result<T> = std::result::Result<T, PerkhubError>;
