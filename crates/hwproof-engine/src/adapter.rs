//! Engine adapter capability and task supervision

use crate::error::{EngineError, EngineResult};
use crate::sby::SbyAdapter;
use crate::state::TaskRun;
use crate::verdict::{Outcome, Verdict};
use async_trait::async_trait;
use hwproof_config::{EngineSpec, Task};
use hwproof_netlist::Design;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Backends driven through the `sby` front end
pub const SBY_BACKENDS: &[&str] = &["smtbmc", "abc", "aiger"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unavailable { reason: String },
}

/// Runs one task against a frozen design
///
/// Implementations own any external process they start and must stop it
/// when the returned future is dropped or `cancel` fires.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        task: &Task,
        design: Arc<Design>,
        cancel: CancellationToken,
    ) -> EngineResult<Verdict>;

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// Settings shared by process-backed adapters
#[derive(Debug, Clone, Default)]
pub struct AdapterSettings {
    /// Backend program; looked up on `PATH` when unset
    pub program: Option<PathBuf>,
    /// Keep per-task working directories after the run
    pub keep_workdir: bool,
    /// Parent for working directories; the system temp dir when unset
    pub workdir_root: Option<PathBuf>,
}

/// Build the adapter for an engine declaration
pub fn adapter_for(spec: &EngineSpec, settings: AdapterSettings) -> EngineResult<Arc<dyn EngineAdapter>> {
    if SBY_BACKENDS.contains(&spec.backend.as_str()) {
        Ok(Arc::new(SbyAdapter::new(spec.clone(), settings)))
    } else {
        Err(EngineError::Unsupported(spec.backend.clone()))
    }
}

/// Run a task through its lifecycle under a time budget
///
/// A budget overrun yields a `TimedOut` verdict and a fired token a
/// `Cancelled` one; in both cases the adapter future is dropped, which stops
/// its process. Engine errors are returned as they are.
pub async fn supervise(
    adapter: &dyn EngineAdapter,
    task: &Task,
    design: Arc<Design>,
    budget: Duration,
    cancel: CancellationToken,
) -> EngineResult<Verdict> {
    let mut run = TaskRun::new(&task.name);
    if cancel.is_cancelled() {
        run.finish(Outcome::Cancelled)?;
        info!("Task {} cancelled before start", task.name);
        return Ok(Verdict::cancelled(task, run.elapsed()));
    }

    run.start()?;
    info!(
        "Task {} started on {} ({} depth {}, budget {:.0}s)",
        task.name,
        adapter.name(),
        task.mode,
        task.depth(),
        budget.as_secs_f64()
    );

    let verdict = tokio::select! {
        biased;
        _ = cancel.cancelled() => Verdict::cancelled(task, run.elapsed()),
        result = tokio::time::timeout(budget, adapter.run(task, design, cancel.child_token())) => {
            match result {
                Ok(verdict) => verdict?,
                Err(_) => {
                    warn!("Task {} exceeded its {:.0}s budget", task.name, budget.as_secs_f64());
                    Verdict::timed_out(task, run.elapsed())
                }
            }
        }
    };

    run.finish(verdict.outcome)?;
    info!(
        "Task {} finished: {} in {:.2}s",
        task.name,
        verdict.outcome,
        verdict.elapsed.as_secs_f64()
    );
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwproof_config::Mode;

    #[test]
    fn test_factory_backends() {
        for backend in SBY_BACKENDS {
            let adapter = adapter_for(&EngineSpec::new(*backend, "z3"), AdapterSettings::default()).unwrap();
            assert_eq!(adapter.name(), "sby");
        }
        let err = adapter_for(&EngineSpec::new("btor", "z3"), AdapterSettings::default()).err();
        assert_eq!(err, Some(EngineError::Unsupported("btor".into())));
    }

    #[tokio::test]
    async fn test_precancelled_task_never_runs() {
        let adapter = crate::scripted::ScriptedAdapter::new().hang("bmc");
        let task = Task::new("bmc", Mode::Bmc, 4).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let verdict = supervise(
            &adapter,
            &task,
            Arc::new(Design::new("d")),
            Duration::from_secs(60),
            cancel,
        )
        .await
        .unwrap();
        assert_eq!(verdict.outcome, Outcome::Cancelled);
        assert_eq!(adapter.invocations(), 0);
    }
}
