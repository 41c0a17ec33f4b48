/*!
 * Error types for the yaetwai application.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when calling a translation backend
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The request did not complete within the per-attempt timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend is missing required configuration (model, API key, ...)
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    /// Every attempt allowed by the retry policy failed
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last: Box<BackendError>,
    },
}

impl BackendError {
    /// Whether another attempt could succeed.
    ///
    /// Timeouts, transport failures, server-side errors and rate limiting are
    /// transient; authentication, client errors and missing configuration are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_)
            | Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::AuthenticationError(_) | Self::NotConfigured(_) | Self::RetriesExhausted { .. } => {
                false
            }
        }
    }
}

/// Errors reported for a single translation unit
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Error from the backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The backend answered with nothing usable
    #[error("Backend returned an empty translation")]
    EmptyResponse,
}

/// Errors raised while persisting the translation cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The table could not be written
    #[error("Failed to save translation cache {path:?}: {source}")]
    Save {
        /// Cache file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The table could not be serialized
    #[error("Failed to serialize translation cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while reading, parsing or writing documents
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Error from a file operation
    #[error("File error on {path:?}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The container could not be read or written
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Markup in a part could not be parsed
    #[error("Malformed markup in {part}: {message}")]
    Markup {
        /// Part id
        part: String,
        /// Parser message
        message: String,
    },

    /// A part referenced by id does not exist
    #[error("Unknown document part: {0}")]
    UnknownPart(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the cache
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from document handling
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// The translation pipeline could not run
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
