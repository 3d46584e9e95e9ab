//! Error types for netlist loading and validation

use thiserror::Error;

/// Result type for netlist operations
pub type Result<T> = std::result::Result<T, NetlistError>;

/// Errors that can occur while loading or querying a design
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetlistError {
    /// Malformed design source
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The design could not be written as a JSON dump
    #[error("cannot serialize design: {0}")]
    Serialize(String),

    /// I/O error reading or writing a design file
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Module lookup failed
    #[error("module `{0}` not found in design")]
    NotFound(String),

    /// Two modules with the same name were loaded
    #[error("module `{0}` is defined more than once")]
    DuplicateModule(String),

    /// A primitive cell does not match its declared schema
    #[error("cell `{cell}` of kind `{kind}` violates its schema: {detail}")]
    SchemaMismatch {
        cell: String,
        kind: String,
        detail: String,
    },
}

impl NetlistError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        NetlistError::Parse {
            line,
            message: message.into(),
        }
    }
}
