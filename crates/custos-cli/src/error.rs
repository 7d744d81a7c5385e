//! Error types for custos-cli

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for custos-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in custos-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from custos-core
    #[error("Core error: {0}")]
    Core(#[from] custos_core::Error),

    /// Error from custos-acl
    #[error("ACL error: {0}")]
    Acl(#[from] custos_acl::Error),

    /// The fixture file is malformed or inconsistent
    #[error("Fixture error{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Fixture {
        /// Fixture file, when known
        path: Option<PathBuf>,
        /// What went wrong
        message: String,
    },

    /// The check request could not be built
    #[error("Invalid request: {0}")]
    Request(String),
}

impl Error {
    /// Create a fixture error without a file.
    pub fn fixture<S: Into<String>>(message: S) -> Self {
        Self::Fixture {
            path: None,
            message: message.into(),
        }
    }

    /// Attach a file path to a fixture error.
    pub fn in_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Self::Fixture { message, .. } => Self::Fixture {
                path: Some(file.into()),
                message,
            },
            other => other,
        }
    }
}
