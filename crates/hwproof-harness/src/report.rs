//! Run reports

use crate::error::{HarnessError, Result};
use hwproof_config::Mode;
use hwproof_engine::{CoverStatus, EngineError, Outcome, Verdict};
use hwproof_techmap::RewriteReport;
use indexmap::IndexMap;
use serde_json::json;
use std::time::Duration;

/// What happened to one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Completed(Verdict),
    /// The engine could not produce a verdict
    Errored(EngineError),
}

impl TaskResult {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            TaskResult::Completed(verdict) => Some(verdict),
            TaskResult::Errored(_) => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.verdict().map(|v| v.outcome)
    }

    pub fn passed(&self) -> bool {
        self.outcome() == Some(Outcome::Passed)
    }

    fn label(&self) -> String {
        match self {
            TaskResult::Completed(verdict) => verdict.outcome.to_string(),
            TaskResult::Errored(_) => "ERROR".to_string(),
        }
    }
}

impl From<std::result::Result<Verdict, EngineError>> for TaskResult {
    fn from(result: std::result::Result<Verdict, EngineError>) -> Self {
        match result {
            Ok(verdict) => TaskResult::Completed(verdict),
            Err(error) => TaskResult::Errored(error),
        }
    }
}

/// Results of every task of a run, in declaration order
#[derive(Debug, Clone)]
pub struct RunReport {
    pub rewrites: Vec<RewriteReport>,
    pub results: IndexMap<String, TaskResult>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.results.values().all(TaskResult::passed)
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn get(&self, task: &str) -> Option<&TaskResult> {
        self.results.get(task)
    }

    /// Outcome table followed by traces of failed bmc tasks and cover tables
    pub fn render(&self) -> String {
        let name_width = self
            .results
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(4);

        let mut out = format!("{:<width$}  {:<5}  {:<9}  time\n", "task", "mode", "result", width = name_width);
        for (name, result) in &self.results {
            let (mode, elapsed) = match result.verdict() {
                Some(verdict) => (verdict.mode.as_str(), format!("{:.2}s", verdict.elapsed.as_secs_f64())),
                None => ("-", "-".to_string()),
            };
            out.push_str(&format!(
                "{:<width$}  {:<5}  {:<9}  {}\n",
                name,
                mode,
                result.label(),
                elapsed,
                width = name_width
            ));
        }

        for (name, result) in &self.results {
            match result {
                TaskResult::Errored(error) => {
                    out.push_str(&format!("\n{}: {}\n", name, error));
                }
                TaskResult::Completed(verdict) => {
                    if verdict.mode == Mode::Bmc && verdict.outcome == Outcome::Failed {
                        if let Some(trace) = &verdict.trace {
                            out.push_str(&format!("\nCounterexample for {} ({} steps):\n", name, trace.len()));
                            out.push_str(&trace.render());
                        }
                    }
                    if let Some(cover) = &verdict.cover {
                        out.push_str(&format!("\nCover points of {}:\n", name));
                        for (id, status) in cover {
                            let status = match status {
                                CoverStatus::Reached(step) => format!("reached in step {}", step),
                                CoverStatus::Unreached => "unreached".to_string(),
                            };
                            out.push_str(&format!("  {}  {}\n", id, status));
                        }
                    }
                    for line in &verdict.diagnostics {
                        out.push_str(&format!("  {}: {}\n", name, line));
                    }
                }
            }
        }

        out.push_str(&format!(
            "\n{} of {} tasks passed in {:.2}s\n",
            self.results.values().filter(|r| r.passed()).count(),
            self.results.len(),
            self.elapsed.as_secs_f64()
        ));
        out
    }

    pub fn to_json(&self) -> Result<String> {
        let tasks: serde_json::Map<String, serde_json::Value> = self
            .results
            .iter()
            .map(|(name, result)| {
                let value = match result {
                    TaskResult::Completed(verdict) => json!({ "verdict": verdict }),
                    TaskResult::Errored(error) => json!({ "error": error.to_string() }),
                };
                (name.clone(), value)
            })
            .collect();

        let report = json!({
            "success": self.success(),
            "elapsed": self.elapsed.as_secs_f64(),
            "rewrites": self.rewrites,
            "tasks": tasks,
        });
        serde_json::to_string_pretty(&report).map_err(|e| HarnessError::Report(e.to_string()))
    }
}
