//! Error types for Klocwork API operations.

use thiserror::Error;

/// Errors that can occur during Klocwork API operations.
///
/// Transport failures of individual requests are normally returned as data
/// (see [`Fetched`](crate::Fetched) and [`Sent`](crate::Sent)); they only show
/// up here when a lazily cached accessor could not populate its cache.
#[derive(Debug, Error)]
pub enum KwError {
    /// No record in the token store matched the requested host, port and user.
    #[error("No valid token found for {query}! Use kwauth to log in first")]
    CredentialNotFound { query: String },

    /// Configuration is missing or incomplete.
    #[error("Klocwork configuration required: {0}")]
    ConfigMissing(String),

    /// A configuration value is present but unusable.
    #[error("Invalid Klocwork configuration: {0}")]
    ConfigInvalid(String),

    /// A local argument was rejected before any request was made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A response line could not be decoded into the expected entity.
    #[error("Malformed {kind} response at line {line}: {message}")]
    MalformedResponse {
        kind: &'static str,
        line: usize,
        message: String,
    },

    /// A request failed while populating a cached collection.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The HTTP client could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The token store could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed request, captured as data.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-200 status.
    #[error("Klocwork API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be sent or its body could not be read.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Result type alias for Klocwork operations.
pub type Result<T> = core::result::Result<T, KwError>;
