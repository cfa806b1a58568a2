// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for pkgadd
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was missing or empty
    #[error("Bad argument: {0}")]
    BadArgument(&'static str),

    /// Archive read or extraction failure, carrying the underlying message
    #[error("{0}")]
    Archive(String),

    /// The package origin is already registered
    #[error("package already installed: {origin}")]
    AlreadyInstalled { origin: String },

    /// A dependency archive could not be found next to the package
    #[error("missing {0} dependency")]
    MissingDependency(String),

    /// The archive path has no extension to derive dependency filenames from
    #[error("{0} has no extension")]
    NoExtension(String),

    /// A nested dependency install failed
    #[error("error while installing {} (dependency): {source}", path.display())]
    DependencyInstall {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// An origin was reached again while it was still being installed
    #[error("dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database initialization error
    #[error("Failed to initialize database: {0}")]
    InitError(String),

    /// Database not found
    #[error("Database not found at path: {0}")]
    DatabaseNotFound(String),

    /// Any other unrecoverable condition
    #[error("{0}")]
    Fatal(String),
}

impl Error {
    /// True when the install was refused because the origin is already present.
    ///
    /// Callers can treat this as a no-op rather than a failure.
    pub fn is_already_installed(&self) -> bool {
        matches!(self, Error::AlreadyInstalled { .. })
    }
}

/// Result type alias using pkgadd's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_install_wraps_nested_message() {
        let err = Error::DependencyInstall {
            path: PathBuf::from("/pkgs/bar-2.0.tgz"),
            source: Box::new(Error::MissingDependency("baz-3.1".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "error while installing /pkgs/bar-2.0.tgz (dependency): missing baz-3.1 dependency"
        );
    }

    #[test]
    fn test_already_installed_is_distinguishable() {
        let err = Error::AlreadyInstalled {
            origin: "local/foo".to_string(),
        };
        assert!(err.is_already_installed());
        assert!(!Error::Fatal("boom".to_string()).is_already_installed());
    }
}
