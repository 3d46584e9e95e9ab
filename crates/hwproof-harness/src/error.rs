//! Orchestrator errors
//!
//! Everything here aborts a run before any task is dispatched. Failures of
//! individual tasks are recorded in the run report instead.

use hwproof_config::ConfigError;
use hwproof_engine::EngineError;
use hwproof_netlist::NetlistError;
use hwproof_techmap::RewriteError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error(transparent)]
    Netlist(#[from] NetlistError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Script reads a file that `[files]` does not list
    #[error("script reads `{0}`, which is not listed in [files]")]
    UnlistedFile(String),

    /// A script step needs a design but nothing was read yet
    #[error("`{0}` runs before any design is read")]
    NoDesign(String),

    #[error("no top module selected; add `prep -top <module>` to the script")]
    NoTop,

    #[error("harness declares no tasks")]
    NoTasks,

    #[error("cannot serialize run report: {0}")]
    Report(String),
}
