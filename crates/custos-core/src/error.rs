//! Error types for custos-core

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for custos-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in custos-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required value was empty or malformed
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Name of the offending value, if known
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// Configuration could not be resolved or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error, optionally tied to a path
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    Io {
        /// Path involved in the failed operation
        path: Option<PathBuf>,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}

impl Error {
    /// Creates an invalid input error without a field name.
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Error::InvalidInput {
            field: None,
            message: message.into(),
        }
    }

    /// Creates an invalid input error for a named field.
    pub fn invalid_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::InvalidInput {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path that caused it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: Some(path.as_ref().to_path_buf()),
            source,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { path: None, source }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_field_error() {
        let err = Error::invalid_field("identifier", "must not be empty");
        let Error::InvalidInput { field, message } = err else {
            unreachable!("Expected InvalidInput error variant");
        };
        assert_eq!(field, Some("identifier".to_string()));
        assert_eq!(message, "must not be empty");
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::config("bad value");
        assert_eq!(err.to_string(), "Configuration error: bad value");
    }

    #[test]
    fn test_io_error_with_path_display() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/custos.toml",
        );
        assert_eq!(err.to_string(), "I/O error at /tmp/custos.toml: gone");
    }

    #[test]
    fn test_io_error_without_path_display() {
        let err: Error = std::io::Error::other("boom").into();
        assert_eq!(err.to_string(), "I/O error: boom");
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
