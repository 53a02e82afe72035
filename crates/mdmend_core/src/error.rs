//! Error types for the mdmend engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring the engine or processing files.
#[derive(Debug, Error)]
pub enum MdmendError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rule id was registered twice.
    #[error("Rule {0} is already registered")]
    DuplicateRule(String),

    /// A document could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MdmendError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MdmendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = MdmendError::config("unknown field `colour`");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown field `colour`"
        );
    }

    #[test]
    fn test_read_error_names_path() {
        let err = MdmendError::read(
            "docs/missing.md",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "Failed to read docs/missing.md: not found");
    }

    #[test]
    fn test_duplicate_rule_message() {
        let err = MdmendError::DuplicateRule("MD009".to_string());
        assert_eq!(err.to_string(), "Rule MD009 is already registered");
    }
}
