//! Task dispatch

use crate::error::{HarnessError, Result};
use crate::prepare::{prepare, PreparedDesign};
use crate::report::{RunReport, TaskResult};
use crate::settings::RunSettings;
use hwproof_config::HarnessConfig;
use hwproof_engine::{adapter_for, supervise, EngineAdapter, EngineError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs every task of a harness against one prepared design
pub struct Orchestrator {
    config: HarnessConfig,
    adapter: Arc<dyn EngineAdapter>,
    settings: RunSettings,
    base_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(config: HarnessConfig, adapter: Arc<dyn EngineAdapter>, settings: RunSettings) -> Self {
        Self {
            config,
            adapter,
            settings,
            base_dir: PathBuf::from("."),
        }
    }

    /// Load a harness file and build the adapter its engine line names
    ///
    /// Design files are resolved against the harness file's directory.
    pub fn from_path(path: impl AsRef<Path>, settings: RunSettings) -> Result<Self> {
        let path = path.as_ref();
        let config = HarnessConfig::load(path)?;
        let adapter = adapter_for(&config.engine, settings.to_adapter_settings())?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(config, adapter, settings).with_base_dir(base_dir))
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn adapter(&self) -> &Arc<dyn EngineAdapter> {
        &self.adapter
    }

    /// Read and canonicalize the design without starting any engine
    pub fn prepare(&self) -> Result<PreparedDesign> {
        prepare(&self.config, &self.base_dir)
    }

    /// Prepare the design, then run all tasks
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport> {
        let prepared = self.prepare()?;
        self.dispatch(prepared, cancel).await
    }

    /// Run all tasks against an already prepared design
    ///
    /// Tasks run concurrently, at most `jobs` at a time, each under its own
    /// budget. An engine error is recorded for its task and does not stop the
    /// others.
    pub async fn dispatch(&self, prepared: PreparedDesign, cancel: CancellationToken) -> Result<RunReport> {
        if self.config.tasks.is_empty() {
            return Err(HarnessError::NoTasks);
        }
        let start = Instant::now();
        let design = Arc::new(prepared.design);
        let jobs = self.settings.jobs.max(1);
        let semaphore = Arc::new(Semaphore::new(jobs));

        info!(
            "Dispatching {} tasks to {} ({} at a time)",
            self.config.tasks.len(),
            self.adapter.name(),
            jobs
        );

        let mut results: IndexMap<String, Option<TaskResult>> = self
            .config
            .tasks
            .keys()
            .map(|name| (name.clone(), None))
            .collect();

        let mut set = JoinSet::new();
        for task in self.config.tasks.values().cloned() {
            let adapter = Arc::clone(&self.adapter);
            let design = Arc::clone(&design);
            let semaphore = Arc::clone(&semaphore);
            let token = cancel.child_token();
            let budget = task.options.timeout.unwrap_or(self.settings.default_timeout);

            set.spawn(async move {
                // Waiting for a slot ends early on cancellation; supervise
                // then reports the task as cancelled without running it.
                let _permit = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let result = supervise(adapter.as_ref(), &task, design, budget, token).await;
                (task.name, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, result)) => {
                    if let Err(e) = &result {
                        warn!("Task {} errored: {}", name, e);
                    }
                    results.insert(name, Some(result.into()));
                }
                Err(e) => error!("Task worker failed: {}", e),
            }
        }

        let results = results
            .into_iter()
            .map(|(name, result)| {
                let result = result.unwrap_or_else(|| {
                    TaskResult::Errored(EngineError::Crash {
                        code: None,
                        detail: "task worker panicked".to_string(),
                    })
                });
                (name, result)
            })
            .collect();

        let report = RunReport {
            rewrites: prepared.rewrites,
            results,
            elapsed: start.elapsed(),
        };
        info!(
            "Run finished in {:.2}s: {}",
            report.elapsed.as_secs_f64(),
            if report.success() { "all tasks passed" } else { "some tasks did not pass" }
        );
        Ok(report)
    }
}
