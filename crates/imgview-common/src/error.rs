//! Unified error type for the imgview delivery core.
//!
//! Every failure in the workspace funnels into [`Error`], which carries enough
//! context for the HTTP layer to derive a status code via [`Error::http_status`].
//! Nothing in this core retries: each variant is local to the request that hit it.

use std::fmt;

/// Unified error type covering all failure modes of media delivery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested content or representation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "content", "representation").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A container manifest or its LOD/representation list could not be used.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Decoding, encoding or an external encoder failed.
    #[error("Codec error [{operation}]: {message}")]
    Codec {
        /// The codec operation that failed (e.g. "decode", "encode avif").
        operation: String,
        /// Human-readable error description.
        message: String,
    },

    /// Persisting a cache entry failed.
    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Codec { .. } => 502,
            Error::MalformedContainer(_) => 500,
            Error::CacheWrite(_) => 500,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::MalformedContainer`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedContainer(msg.into())
    }

    /// Convenience constructor for [`Error::Codec`].
    pub fn codec(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Codec {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::CacheWrite`].
    pub fn cache_write(msg: impl Into<String>) -> Self {
        Error::CacheWrite(msg.into())
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this error means the requested entity is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
