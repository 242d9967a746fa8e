//! Error types shared by every ETL stage
//!
//! Errors are never recovered locally: each variant aborts the current run
//! and is reported to the operator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The source file, object or table does not exist
    #[error("Source not found: {0}")]
    NotFound(String),

    /// The source exists but cannot be decoded as the expected format
    #[error("Failed to parse {what}: {message}")]
    Format { what: String, message: String },

    /// A single cell value failed normalization
    #[error("Invalid {kind} value {value:?}: {reason}")]
    Value {
        kind: &'static str,
        value: String,
        reason: String,
    },

    /// The target store could not be reached
    #[error("Cannot reach {target}: {message}")]
    Connection { target: String, message: String },

    /// Dataset columns differ from the declared table schema
    #[error("Schema mismatch for table {table}: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// The target store rejected a statement
    #[error("Statement failed on {target}: {message}")]
    Statement { target: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source {0} contains no rows")]
    EmptySource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn format(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Format {
            what: what.into(),
            message: err.to_string(),
        }
    }

    pub fn value(kind: &'static str, value: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Value {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn connection(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Connection {
            target: target.into(),
            message: err.to_string(),
        }
    }

    pub fn statement(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Statement {
            target: target.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_error_message() {
        let err = Error::value("uuid", "not-a-uuid", "invalid character");
        assert_eq!(
            err.to_string(),
            "Invalid uuid value \"not-a-uuid\": invalid character"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
