//! Orchestrator runs over the TransparentLatch harness with scripted engines

use hwproof_config::HarnessConfig;
use hwproof_engine::*;
use hwproof_harness::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn harness_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../harness")
}

fn config() -> HarnessConfig {
    HarnessConfig::load(harness_dir().join("TransparentLatch.sby")).unwrap()
}

fn orchestrator(config: HarnessConfig, adapter: ScriptedAdapter) -> Orchestrator {
    Orchestrator::new(config, Arc::new(adapter), RunSettings::default()).with_base_dir(harness_dir())
}

fn cover_pass() -> BackendReport {
    BackendReport::pass().with_cover("$cover$holds_1234", CoverStatus::Reached(3))
}

#[test]
fn test_prepare_fixture() {
    let prepared = orchestrator(config(), ScriptedAdapter::new()).prepare().unwrap();

    assert_eq!(prepared.design.namespace.as_deref(), Some("techmap1"));
    assert_eq!(prepared.design.cell_count("$dlatch"), 0);
    assert_eq!(prepared.design.cell_count("$dff"), 1);
    assert_eq!(prepared.rewrites.len(), 1);
    assert_eq!(prepared.rewrites[0].replacements[0].name, "$techmap1$latch$internal_reg");
}

#[tokio::test]
async fn test_budget_overrun_is_isolated() {
    let mut config = config();
    config.tasks["bmc"].options.timeout = Some(Duration::from_millis(100));
    let adapter = ScriptedAdapter::new().hang("bmc").respond("cover", cover_pass());

    let report = orchestrator(config, adapter)
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.get("bmc").unwrap().outcome(), Some(Outcome::TimedOut));
    assert_eq!(report.get("cover").unwrap().outcome(), Some(Outcome::Passed));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_crash_is_isolated() {
    let adapter = ScriptedAdapter::new()
        .error(
            "bmc",
            EngineError::Crash {
                code: Some(16),
                detail: "solver aborted".into(),
            },
        )
        .respond("cover", cover_pass());

    let report = orchestrator(config(), adapter)
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(
        report.get("bmc").unwrap(),
        TaskResult::Errored(EngineError::Crash { code: Some(16), .. })
    ));
    assert!(report.get("cover").unwrap().passed());
    assert!(report.render().contains("solver aborted"));
}

#[tokio::test]
async fn test_cancel_stops_every_task() {
    let adapter = ScriptedAdapter::new().hang("bmc").hang("cover");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = orchestrator(config(), adapter).run(cancel).await.unwrap();
    for result in report.results.values() {
        assert_eq!(result.outcome(), Some(Outcome::Cancelled));
    }
}

#[tokio::test]
async fn test_structural_error_starts_no_engine() {
    let mut config = config();
    config.files.clear();
    let adapter = Arc::new(ScriptedAdapter::new().respond("bmc", BackendReport::pass()));

    let orchestrator = Orchestrator::new(config, adapter.clone(), RunSettings::default())
        .with_base_dir(harness_dir());
    let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, HarnessError::UnlistedFile("TransparentLatch.il".into()));
    assert_eq!(adapter.invocations(), 0);
}

#[test]
fn test_from_path_builds_sby_adapter() {
    let orchestrator = Orchestrator::from_path(
        harness_dir().join("TransparentLatch.toml"),
        RunSettings::default(),
    )
    .unwrap();
    assert_eq!(orchestrator.adapter().name(), "sby");
    assert_eq!(orchestrator.config().tasks.len(), 2);
    assert!(orchestrator.prepare().is_ok());
}
