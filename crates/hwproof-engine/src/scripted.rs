//! Scripted adapter returning canned results

use crate::adapter::EngineAdapter;
use crate::error::{EngineError, EngineResult};
use crate::verdict::{BackendReport, Verdict};
use async_trait::async_trait;
use hwproof_config::Task;
use hwproof_netlist::Design;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum Response {
    Report(BackendReport),
    Error(EngineError),
    /// Never answers; only a budget or cancellation ends the task
    Hang,
}

#[derive(Debug, Clone)]
struct Entry {
    response: Response,
    latency: Duration,
}

/// Adapter answering each task name with a canned backend report or error
///
/// Reports go through [`Verdict::conclude`] like real backend output, so
/// task rules apply. Unscripted tasks fail with [`EngineError::Unavailable`].
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    entries: HashMap<String, Entry>,
    invocations: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(mut self, task: &str, response: Response) -> Self {
        let latency = self
            .entries
            .get(task)
            .map(|entry| entry.latency)
            .unwrap_or_default();
        self.entries
            .insert(task.to_string(), Entry { response, latency });
        self
    }

    pub fn respond(self, task: &str, report: BackendReport) -> Self {
        self.insert(task, Response::Report(report))
    }

    pub fn error(self, task: &str, error: EngineError) -> Self {
        self.insert(task, Response::Error(error))
    }

    pub fn hang(self, task: &str) -> Self {
        self.insert(task, Response::Hang)
    }

    /// Delay the answer for a task that already has a response
    pub fn with_latency(mut self, task: &str, latency: Duration) -> Self {
        if let Some(entry) = self.entries.get_mut(task) {
            entry.latency = latency;
        }
        self
    }

    /// Number of `run` calls so far
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(
        &self,
        task: &Task,
        _design: Arc<Design>,
        cancel: CancellationToken,
    ) -> EngineResult<Verdict> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        let entry = self.entries.get(&task.name).ok_or_else(|| {
            EngineError::Unavailable(format!("no scripted response for task `{}`", task.name))
        })?;

        tokio::select! {
            _ = cancel.cancelled() => return Ok(Verdict::cancelled(task, start.elapsed())),
            _ = tokio::time::sleep(entry.latency) => {}
        }

        match &entry.response {
            Response::Report(report) => Verdict::conclude(task, report.clone(), start.elapsed()),
            Response::Error(error) => Err(error.clone()),
            Response::Hang => {
                cancel.cancelled().await;
                Ok(Verdict::cancelled(task, start.elapsed()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::{CoverStatus, Outcome};
    use hwproof_config::Mode;

    #[tokio::test]
    async fn test_canned_reports() {
        let adapter = ScriptedAdapter::new()
            .respond("cover", BackendReport::pass().with_cover("c", CoverStatus::Reached(3)))
            .error("bmc", EngineError::Crash { code: Some(16), detail: "boom".into() });
        let design = Arc::new(Design::new("d"));

        let cover = Task::new("cover", Mode::Cover, 10).unwrap();
        let verdict = adapter
            .run(&cover, design.clone(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(verdict.outcome, Outcome::Passed);

        let bmc = Task::new("bmc", Mode::Bmc, 10).unwrap();
        let err = adapter.run(&bmc, design.clone(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Crash { code: Some(16), .. }));

        let other = Task::new("other", Mode::Bmc, 10).unwrap();
        let err = adapter.run(&other, design, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
        assert_eq!(adapter.invocations(), 3);
    }

    #[tokio::test]
    async fn test_cancel_during_latency() {
        let adapter = ScriptedAdapter::new()
            .respond("bmc", BackendReport::pass())
            .with_latency("bmc", Duration::from_secs(30));
        let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let verdict = adapter
            .run(&task, Arc::new(Design::new("d")), cancel)
            .await
            .unwrap();
        assert_eq!(verdict.outcome, Outcome::Cancelled);
    }
}
