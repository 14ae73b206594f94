//! Unified error type for the wavy server.
//!
//! All modules funnel their failures into [`Error`], which carries enough
//! context for request handlers to derive an HTTP status code via
//! [`Error::http_status`]. Startup-only variants (lock, TLS) propagate to
//! `main` and terminate the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Unified error type covering all failure modes in the server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data failed validation (malformed path, empty upload, bad
    /// metadata document).
    #[error("{0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "segment", "listing").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The HTTP method has no handler for the requested path.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// An uploaded archive could not be extracted or yielded no valid files.
    #[error("archive error: {0}")]
    Archive(String),

    /// An I/O operation failed.
    #[error("io error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The single-instance lock could not be acquired. Fatal at startup.
    #[error("instance lock error: {0}")]
    Lock(String),

    /// The TLS context could not be constructed. Fatal at startup.
    #[error("tls error: {0}")]
    Tls(String),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to the HTTP status code it surfaces as.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::Archive(_) => StatusCode::BAD_REQUEST,
            Error::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Lock(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Tls(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<axum::http::Error> for Error {
    fn from(e: axum::http::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.http_status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "server error in handler");
        }

        (status, format!("{self}\n")).into_response()
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
