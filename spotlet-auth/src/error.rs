//! Error types for spotlet-auth

use thiserror::Error;

/// Credential lifecycle errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// HTTP call failed outright (connect, TLS, timeout)
    #[error("Network error: {0}")]
    Transport(String),

    /// Token endpoint answered with a non-success status
    #[error("Token endpoint returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body is not a token response
    #[error("Token response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response decoded but carries unusable values
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Credential persistence failed
    #[error("Credential store error: {0}")]
    Store(#[from] spotlet_common::Error),

    /// Bad client configuration (e.g. unparsable authorize URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No access token is stored
    #[error("Not signed in")]
    NotSignedIn,

    /// Refresh needed but no refresh token is stored
    #[error("No refresh token stored")]
    NoRefreshToken,

    /// The refresh a waiter was queued on never delivered a token
    #[error("Token refresh failed")]
    RefreshFailed,

    /// Caller-side deadline passed before a token arrived
    #[error("Timed out waiting for a valid token")]
    Timeout,
}

/// Convenience Result type using AuthError
pub type Result<T> = std::result::Result<T, AuthError>;
