//! Error types for imgview-codec.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, encoding or reading containers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool failed to execute.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An SRS manifest is unreadable or lists no usable image level.
    #[error("malformed container {}: {message}", path.display())]
    MalformedContainer { path: PathBuf, message: String },

    /// The `image` crate failed to decode or encode.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unsupported operation or format.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a malformed container error.
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedContainer {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    fn operation(&self) -> &'static str {
        match self {
            Error::ToolNotFound { .. } | Error::ToolFailed { .. } => "external tool",
            Error::Image(image::ImageError::Encoding(_)) => "encode",
            Error::Image(_) => "decode",
            Error::Unsupported(_) => "unsupported",
            Error::MalformedContainer { .. } | Error::Io(_) | Error::Json(_) => "container",
        }
    }
}

impl From<Error> for imgview_common::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::MalformedContainer { .. } | Error::Json(_) => {
                imgview_common::Error::malformed(err.to_string())
            }
            Error::Io(source) => imgview_common::Error::Io { source },
            other => imgview_common::Error::codec(other.operation(), other.to_string()),
        }
    }
}
