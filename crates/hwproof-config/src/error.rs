//! Error types for harness configuration

use hwproof_techmap::RewriteError;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while reading a harness configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O error reading a configuration file
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Malformed `.sby` text
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Malformed TOML manifest
    #[error("failed to parse harness manifest: {0}")]
    Toml(String),

    #[error("unsupported configuration format `{0}`")]
    UnsupportedFormat(String),

    #[error("task `{task}` has unknown mode `{mode}`")]
    UnknownMode { task: String, mode: String },

    #[error("task `{task}` is missing required option `{option}`")]
    MissingOption { task: String, option: String },

    #[error("task `{task}`: invalid value `{value}` for `{option}`: {reason}")]
    InvalidOption {
        task: String,
        option: String,
        value: String,
        reason: String,
    },

    #[error("task `{task}` has unknown option `{option}`")]
    UnknownOption { task: String, option: String },

    #[error("task `{0}` is declared more than once")]
    DuplicateTask(String),

    /// Task-specific option for a task that was never declared
    #[error("options given for undeclared task `{0}`")]
    UnknownTask(String),

    #[error("no engine declared")]
    MissingEngine,

    #[error("invalid engine declaration: {0}")]
    InvalidEngine(String),

    #[error("unknown script command `{command}` at line {line}")]
    UnknownCommand { line: usize, command: String },

    #[error("script references unknown template `{0}`")]
    UnknownTemplate(String),

    #[error("invalid selector in script: {0}")]
    Selector(#[from] RewriteError),
}

impl ConfigError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ConfigError::Syntax {
            line,
            message: message.into(),
        }
    }
}
