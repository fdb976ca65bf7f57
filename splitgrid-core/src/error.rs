//! # Error handling for Splitgrid Core
//!
//! This module provides the error type shared by the grid layout engine,
//! its persistence layer and its configuration.
//!
//! Most engine failures are not surfaced to users: an invalid mutation
//! request (closing the last pane, dragging a boundary that does not exist)
//! is reported as [`Error::Rejected`] internally and turned into a no-op by
//! the session, and a malformed persisted layout is reported as
//! [`Error::Restore`] and replaced by a freshly computed layout.

use thiserror::Error;

/// Result type used throughout Splitgrid Core.
///
/// # Example
///
/// ```rust
/// use splitgrid_core::{Result, Error};
///
/// fn example_function() -> Result<usize> {
///     Ok(4)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Splitgrid Core.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Persistent storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// A mutation request that does not apply to the current state
    #[error("Rejected: {reason}")]
    Rejected { reason: String },

    /// A persisted layout that failed restore validation
    #[error("Restore rejected: {reason}")]
    Restore { reason: String },

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with custom message
    #[error("Error: {message}")]
    Generic { message: String },
}

impl Error {
    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::Error;
    ///
    /// let error = Error::config("Invalid configuration file format");
    /// ```
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::Error;
    ///
    /// let error = Error::validation("grid.max_panes", "must be between 1 and 16");
    /// ```
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new rejected-mutation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::Error;
    ///
    /// let error = Error::rejected("pane 3 is not active");
    /// assert!(error.is_rejected());
    /// ```
    pub fn rejected<S: Into<String>>(reason: S) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create a new restore error.
    pub fn restore<S: Into<String>>(reason: S) -> Self {
        Self::Restore {
            reason: reason.into(),
        }
    }

    /// Create a new generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Check if this error is a rejected mutation request.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Check if this error is a rejected restore.
    pub fn is_restore(&self) -> bool {
        matches!(self, Self::Restore { .. })
    }

    /// Check if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get the error category as a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::Error;
    ///
    /// let error = Error::restore("mode mismatch");
    /// assert_eq!(error.category(), "Restore");
    /// ```
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::Storage { .. } => "Storage",
            Self::Validation { .. } => "Validation",
            Self::Rejected { .. } => "Rejected",
            Self::Restore { .. } => "Restore",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Toml(_) => "TOML",
            Self::Generic { .. } => "Generic",
        }
    }
}

/// Convenience macro for creating rejected-mutation errors.
///
/// # Example
///
/// ```rust
/// use splitgrid_core::rejected;
///
/// let err = rejected!("pane {} is not active", 3);
/// assert!(err.is_rejected());
/// ```
#[macro_export]
macro_rules! rejected {
    ($($arg:tt)*) => {
        $crate::Error::rejected(format!($($arg)*))
    };
}

/// Convenience macro for creating restore errors.
#[macro_export]
macro_rules! restore_error {
    ($($arg:tt)*) => {
        $crate::Error::restore(format!($($arg)*))
    };
}

/// Convert from `anyhow::Error` to our custom error type.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let error = Error::config("Test message");
        assert!(error.is_config());
        assert_eq!(error.category(), "Config");
        assert!(error.to_string().contains("Test message"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::from(io_error);
        assert_eq!(error.category(), "IO");
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation("grid.max_panes", "out of range");
        assert!(error.is_validation());
        assert!(error.to_string().contains("grid.max_panes"));
    }

    #[test]
    fn test_error_macros() {
        let err = rejected!("pane {} is not active", 7);
        assert!(err.is_rejected());
        assert!(err.to_string().contains("pane 7"));

        let err = restore_error!("count {} != {}", 4, 6);
        assert!(err.is_restore());
        assert_eq!(err.category(), "Restore");
    }

    #[test]
    fn test_anyhow_conversion() {
        let anyhow_err = anyhow::anyhow!("Test error");
        let error = Error::from(anyhow_err);
        assert_eq!(error.category(), "Generic");
    }
}
