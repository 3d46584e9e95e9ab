//! Per-task run state machine
//!
//! ```text
//! Pending -> Running -> Passed | Failed | Unknown | TimedOut | Cancelled
//! Pending -> Cancelled
//! ```
//!
//! Terminal states are final.

use crate::error::{EngineError, EngineResult};
use crate::verdict::Outcome;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskState {
    Pending,
    Running,
    Passed,
    Failed,
    Unknown,
    TimedOut,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running)
    }

    fn can_transition_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Pending, TaskState::Running) => true,
            (TaskState::Pending, TaskState::Cancelled) => true,
            (TaskState::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl From<Outcome> for TaskState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => TaskState::Passed,
            Outcome::Failed => TaskState::Failed,
            Outcome::Unknown => TaskState::Unknown,
            Outcome::TimedOut => TaskState::TimedOut,
            Outcome::Cancelled => TaskState::Cancelled,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Passed => "passed",
            TaskState::Failed => "failed",
            TaskState::Unknown => "unknown",
            TaskState::TimedOut => "timed out",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one task invocation
#[derive(Debug)]
pub struct TaskRun {
    task: String,
    state: TaskState,
    started: Option<Instant>,
}

impl TaskRun {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            state: TaskState::Pending,
            started: None,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Time since the run entered `Running`
    pub fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn start(&mut self) -> EngineResult<()> {
        self.transition(TaskState::Running)?;
        self.started = Some(Instant::now());
        Ok(())
    }

    pub fn finish(&mut self, outcome: Outcome) -> EngineResult<()> {
        self.transition(outcome.into())
    }

    pub fn transition(&mut self, next: TaskState) -> EngineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Task {}: {} -> {}", self.task, self.state, next);
        self.state = next;
        Ok(())
    }
}
