//! Engine declarations

use crate::error::{ConfigError, Result};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SOLVER: &str = "yices";

/// Backend and solver a harness runs its tasks with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSpec {
    pub backend: String,
    #[serde(default = "default_solver")]
    pub solver: String,
    #[serde(default)]
    pub flags: IndexSet<String>,
}

fn default_solver() -> String {
    DEFAULT_SOLVER.to_string()
}

impl EngineSpec {
    pub fn new(backend: impl Into<String>, solver: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            solver: solver.into(),
            flags: IndexSet::new(),
        }
    }

    /// Parse an `[engines]` line: `<backend> [flags...] [solver]`
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let backend = words
            .next()
            .filter(|word| !word.starts_with('-'))
            .ok_or_else(|| ConfigError::InvalidEngine(format!("`{}` names no backend", line)))?;

        let mut spec = EngineSpec::new(backend, DEFAULT_SOLVER);
        let mut solver = None;
        for word in words {
            if word.starts_with('-') {
                if solver.is_some() {
                    return Err(ConfigError::InvalidEngine(format!(
                        "flag `{}` follows the solver in `{}`",
                        word, line
                    )));
                }
                spec.flags.insert(word.to_string());
            } else if solver.replace(word).is_some() {
                return Err(ConfigError::InvalidEngine(format!(
                    "more than one solver in `{}`",
                    line
                )));
            }
        }
        if let Some(solver) = solver {
            spec.solver = solver.to_string();
        }
        Ok(spec)
    }
}

impl fmt::Display for EngineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.backend)?;
        for flag in &self.flags {
            write!(f, " {}", flag)?;
        }
        write!(f, " {}", self.solver)
    }
}
