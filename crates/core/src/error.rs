//! Coded errors for storage and configuration files
//!
//! Every error carries a stable code (`E2001`, `E3002`, ...) so hosts can
//! branch on it, plus optional context and a suggestion shown to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // IO errors (2xxx)
    /// Generic I/O failure
    IoError = 2000,
    /// File does not exist
    FileNotFound = 2001,
    /// Missing permissions
    PermissionDenied = 2002,

    // Configuration errors (3xxx)
    /// Configuration file missing
    ConfigNotFound = 3001,
    /// Configuration file could not be parsed
    ConfigParseError = 3002,

    // Storage errors (4xxx)
    /// Backing store disabled or unreachable
    StorageUnavailable = 4001,
    /// Stored data could not be encoded or decoded
    StorageCorrupt = 4002,
}

impl ErrorCode {
    /// Numeric code
    #[must_use]
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Human-readable category
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            4 => "Storage",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Error raised by the core utilities
#[derive(Error, Debug)]
pub struct Error {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// What was being done when it failed
    pub context: Option<String>,
    /// How the user can fix it
    pub suggestion: Option<String>,
    /// Underlying error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  hint: {suggestion}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Attach context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a suggestion
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach the underlying error
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// An explicitly requested configuration file does not exist
    pub fn config_not_found(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .wecare.toml file or pass --config with an existing path")
    }

    /// The storage directory cannot be created or opened
    pub fn storage_unavailable(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::StorageUnavailable,
            format!("Storage unavailable at {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the directory is writable or pass --storage-dir")
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::StorageCorrupt, format!("JSON error: {err}")).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {err}"))
            .with_source(err)
    }
}

/// Adds context to core results
pub trait ResultExt<T> {
    /// Attach context to the error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
