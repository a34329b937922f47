//! Error types for StudioSync.
//!
//! Library crates use [`StudioSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all StudioSync operations.
#[derive(Debug, thiserror::Error)]
pub enum StudioSyncError {
    /// A credential or destination value is absent or empty.
    #[error("configuration missing: {field}")]
    ConfigurationMissing { field: String },

    /// The token endpoint refused the identity pair or could not be reached.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A platform endpoint answered with a non-ok status code.
    #[error("platform rejected {endpoint} (code {code}): {message}")]
    PlatformRejected {
        endpoint: String,
        code: i64,
        message: String,
    },

    /// Network failure or an unparseable response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// Extraction finished without a single usable turn.
    #[error("no conversation found, make sure the page has finished loading")]
    ExtractionEmpty,

    /// Host page interaction (locate, activate, read) failed.
    #[error("page error: {0}")]
    Page(String),

    /// Configuration loading or parsing error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid transcript file, bad payload shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StudioSyncError>;

impl StudioSyncError {
    /// Create a configuration-missing error for the named field.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            field: field.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a page interaction error.
    pub fn page(msg: impl Into<String>) -> Self {
        Self::Page(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
