//! Configuration error types for loading and parsing TOML config files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("Invalid configuration at {path}:{line}:{column}: {message}")]
    ParseError {
        /// Path to the file containing the error.
        path: PathBuf,
        /// One-based line index of the error (0 if unknown).
        line: usize,
        /// One-based column index of the error (0 if unknown).
        column: usize,
        /// Human-readable description of the parse failure.
        message: String,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    NotFound {
        /// Path that was requested but does not exist.
        path: PathBuf,
    },

    /// A field parsed but holds an unusable value.
    #[error("Invalid value for {field}: {value:?} ({message})")]
    InvalidValue {
        /// Dotted field name, e.g. `connection.retry_interval`.
        field: &'static str,
        /// Offending value as written.
        value: String,
        /// What is wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn parse_error_points_at_position() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("agent-sidebar/config.toml"),
            line: 3,
            column: 7,
            message: "invalid type: integer `5`, expected a string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration at agent-sidebar/config.toml:3:7: invalid type: integer `5`, expected a string"
        );
    }

    #[test]
    fn read_and_missing_file_messages() {
        let unreadable = ConfigError::ReadError {
            path: PathBuf::from("/root/.config/agent-sidebar/config.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(unreadable.to_string().starts_with("Failed to read configuration file"));
        assert!(unreadable.source().is_some());

        let missing = ConfigError::NotFound {
            path: PathBuf::from("/nowhere.toml"),
        };
        assert_eq!(missing.to_string(), "Configuration file not found: /nowhere.toml");
        assert!(missing.source().is_none());
    }

    #[test]
    fn invalid_value_quotes_the_value() {
        let err = ConfigError::InvalidValue {
            field: "connection.retry_interval",
            value: "soon".to_string(),
            message: "expected a duration like \"5s\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for connection.retry_interval: \"soon\" (expected a duration like \"5s\")"
        );
    }
}
