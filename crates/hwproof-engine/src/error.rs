//! Engine errors
//!
//! Timeouts and cancellations are verdict outcomes, not errors.

use crate::state::TaskState;
use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Backend program or solver cannot be reached
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Backend exited abnormally or reported an internal error
    #[error("engine crashed ({}): {detail}", describe_exit(.code))]
    Crash { code: Option<i32>, detail: String },

    /// Backend output is inconsistent with the task
    #[error("engine protocol violation: {0}")]
    Protocol(String),

    #[error("engine I/O error: {0}")]
    Io(String),

    #[error("unsupported engine backend `{0}`")]
    Unsupported(String),

    /// Design handed to the engine cannot be checked
    #[error("invalid design: {0}")]
    InvalidDesign(String),

    #[error("invalid task state transition {from} -> {to}")]
    InvalidTransition { from: TaskState, to: TaskState },
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".to_string(),
    }
}
