//! Error types for the catalog client.
//!
//! # Design
//! `ApiError` is the taxonomy every API operation fails with. `Network`,
//! `Auth`, `Validation` and `NotFound` are the categories callers branch
//! on; the remaining variants carry the raw details of responses that fit
//! none of them. Session storage and configuration have their own error
//! types because they fail for local reasons, not remote ones.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("network failure: {0}")]
    Network(String),

    /// Missing token on a protected call, or the server answered 401/403.
    #[error("not authorized: {0}")]
    Auth(String),

    /// The request was rejected as invalid, by the server (4xx) or locally
    /// before it was sent.
    #[error("rejected: {0}")]
    Validation(String),

    /// The server returned 404 for the addressed book.
    #[error("book not found")]
    NotFound,

    /// The server returned a status outside the categories above (5xx,
    /// redirects).
    #[error("HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Encode(String),
}

/// Errors from reading or writing the persisted session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not access session file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode session file {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration")]
    Load(#[from] config::ConfigError),

    #[error("invalid base url '{url}'")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base url '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("timeout_secs must be at least 1")]
    ZeroTimeout,
}
