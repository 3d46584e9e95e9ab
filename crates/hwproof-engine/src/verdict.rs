//! Verdicts and raw backend reports

use crate::error::{EngineError, EngineResult};
use hwproof_config::{Mode, Task};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Unknown,
    TimedOut,
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Passed => "PASS",
            Outcome::Failed => "FAIL",
            Outcome::Unknown => "UNKNOWN",
            Outcome::TimedOut => "TIMEOUT",
            Outcome::Cancelled => "CANCELLED",
        };
        f.write_str(text)
    }
}

/// Counterexample: one signal valuation per step, values held between changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub steps: Vec<IndexMap<String, String>>,
}

impl Trace {
    pub fn new(steps: Vec<IndexMap<String, String>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Value table with one row per signal and one column per step
    pub fn render(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for step in &self.steps {
            for name in step.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        let name_width = names.iter().map(|n| n.len()).max().unwrap_or(0).max(6);

        let mut out = format!("{:<width$}", "signal", width = name_width);
        for index in 0..self.steps.len() {
            out.push_str(&format!(" | {:>4}", index));
        }
        out.push('\n');
        for name in names {
            out.push_str(&format!("{:<width$}", name, width = name_width));
            for step in &self.steps {
                let value = step.get(name).map(String::as_str).unwrap_or("-");
                out.push_str(&format!(" | {:>4}", value));
            }
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverStatus {
    /// Reached at the given step
    Reached(u32),
    Unreached,
}

/// Cover point id to reachability
pub type CoverTable = IndexMap<String, CoverStatus>;

/// Final result of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub task: String,
    pub mode: Mode,
    pub outcome: Outcome,
    pub trace: Option<Trace>,
    pub cover: Option<CoverTable>,
    pub elapsed: Duration,
    pub diagnostics: Vec<String>,
}

impl Verdict {
    fn bare(task: &Task, outcome: Outcome, elapsed: Duration) -> Self {
        Self {
            task: task.name.clone(),
            mode: task.mode,
            outcome,
            trace: None,
            cover: None,
            elapsed,
            diagnostics: Vec::new(),
        }
    }

    pub fn timed_out(task: &Task, elapsed: Duration) -> Self {
        let mut verdict = Self::bare(task, Outcome::TimedOut, elapsed);
        verdict
            .diagnostics
            .push(format!("time budget of {:.1}s exhausted", elapsed.as_secs_f64()));
        verdict
    }

    pub fn cancelled(task: &Task, elapsed: Duration) -> Self {
        Self::bare(task, Outcome::Cancelled, elapsed)
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// Cover points not reached within the depth bound
    pub fn unreached(&self) -> Vec<&str> {
        self.cover
            .iter()
            .flatten()
            .filter(|(_, status)| **status == CoverStatus::Unreached)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Turn a raw backend report into a verdict for `task`
    ///
    /// A bmc failure must carry a non-empty trace. A cover task passes only
    /// when every declared point was reached within the depth bound; points
    /// reached later count as unreached.
    pub fn conclude(task: &Task, report: BackendReport, elapsed: Duration) -> EngineResult<Self> {
        let mut verdict = Self::bare(task, Outcome::Unknown, elapsed);
        verdict.diagnostics = report.diagnostics;

        match task.mode {
            Mode::Bmc => {
                verdict.outcome = match report.status {
                    BackendStatus::Pass => Outcome::Passed,
                    BackendStatus::Unknown => Outcome::Unknown,
                    BackendStatus::TimedOut => Outcome::TimedOut,
                    BackendStatus::Fail => {
                        let trace = report.trace.filter(|t| !t.is_empty()).ok_or_else(|| {
                            EngineError::Protocol(format!(
                                "bmc task `{}` failed without a counterexample trace",
                                task.name
                            ))
                        })?;
                        verdict.trace = Some(trace);
                        Outcome::Failed
                    }
                };
            }
            Mode::Cover => {
                let mut table = report.cover;
                for (id, status) in table.iter_mut() {
                    if let CoverStatus::Reached(step) = *status {
                        if step >= task.depth() {
                            warn!(
                                "Cover point {} of {} reached at step {}, beyond depth {}",
                                id,
                                task.name,
                                step,
                                task.depth()
                            );
                            *status = CoverStatus::Unreached;
                        }
                    }
                }
                let all_reached = table.values().all(|s| matches!(s, CoverStatus::Reached(_)));

                verdict.outcome = match (report.status, all_reached) {
                    (BackendStatus::Unknown, _) => Outcome::Unknown,
                    (BackendStatus::TimedOut, _) => Outcome::TimedOut,
                    (_, true) if report.status == BackendStatus::Fail => {
                        return Err(EngineError::Protocol(format!(
                            "cover task `{}` failed but reports every point reached",
                            task.name
                        )))
                    }
                    (_, true) => Outcome::Passed,
                    (_, false) => Outcome::Failed,
                };
                verdict.trace = report.trace;
                verdict.cover = Some(table);

                if verdict.outcome == Outcome::Failed {
                    let unreached = verdict.unreached().join(", ");
                    verdict.diagnostics.push(format!("unreached cover points: {}", unreached));
                }
            }
        }
        Ok(verdict)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Pass,
    Fail,
    Unknown,
    /// The backend stopped on its own time limit
    TimedOut,
}

/// What a backend observed, before task rules are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReport {
    pub status: BackendStatus,
    pub trace: Option<Trace>,
    /// Every declared cover point, reached or not
    pub cover: CoverTable,
    pub diagnostics: Vec<String>,
}

impl BackendReport {
    pub fn new(status: BackendStatus) -> Self {
        Self {
            status,
            trace: None,
            cover: CoverTable::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn pass() -> Self {
        Self::new(BackendStatus::Pass)
    }

    pub fn fail(trace: Trace) -> Self {
        let mut report = Self::new(BackendStatus::Fail);
        report.trace = Some(trace);
        report
    }

    pub fn with_cover(mut self, id: impl Into<String>, status: CoverStatus) -> Self {
        self.cover.insert(id.into(), status);
        self
    }
}
