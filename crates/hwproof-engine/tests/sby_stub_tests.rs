//! SbyAdapter against stub `sby` executables
#![cfg(unix)]

use hwproof_config::{EngineSpec, Mode, Task};
use hwproof_engine::*;
use hwproof_netlist::{load_path, Design};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn design() -> Arc<Design> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../harness/TransparentLatch.il");
    Arc::new(load_path(path).unwrap())
}

fn stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("sby");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn adapter(program: PathBuf) -> SbyAdapter {
    SbyAdapter::new(
        EngineSpec::new("smtbmc", "z3"),
        AdapterSettings {
            program: Some(program),
            ..AdapterSettings::default()
        },
    )
}

#[tokio::test]
async fn test_passing_run() {
    let bin = tempfile::tempdir().unwrap();
    let program = stub(
        bin.path(),
        r#"test -f job.sby || exit 3
test -f design.il || exit 3
echo "SBY 12:00:00 [job] engine_0: ##   0:00:00  Checking assertions in step 0.."
echo "SBY 12:00:00 [job] DONE (PASS, rc=0)""#,
    );
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();

    let verdict = adapter(program)
        .run(&task, design(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict.outcome, Outcome::Passed);
    assert!(verdict.trace.is_none());
}

#[tokio::test]
async fn test_failing_run_reads_trace() {
    let bin = tempfile::tempdir().unwrap();
    let program = stub(
        bin.path(),
        r#"mkdir -p job/engine_0
cat > job/engine_0/trace.vcd <<'VCD'
$scope module top $end
$var wire 1 ! le $end
$var wire 16 " q $end
$upscope $end
$enddefinitions $end
#0
0!
b0 "
#10
1!
#20
b1001000110100 "
VCD
echo "SBY [job] engine_0: ##  Checking assertions in step 4.."
echo "SBY [job] engine_0: ##  Assert failed in top: TransparentLatch.py:66"
echo "SBY [job] engine_0: ##  Writing trace to VCD file: engine_0/trace.vcd"
echo "SBY [job] DONE (FAIL, rc=2)""#,
    );
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();

    let verdict = adapter(program)
        .run(&task, design(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict.outcome, Outcome::Failed);
    let trace = verdict.trace.unwrap();
    assert_eq!(trace.len(), 5);
    assert_eq!(trace.steps[1]["le"], "1");
    assert_eq!(trace.steps[4]["q"], "0001001000110100");
}

#[tokio::test]
async fn test_cover_run_uses_declared_points() {
    let bin = tempfile::tempdir().unwrap();
    let program = stub(
        bin.path(),
        r#"echo "SBY [job] engine_0: ##  Reached cover statement at TransparentLatch.py:70 (\$cover\$holds_1234) in step 3."
echo "SBY [job] DONE (PASS, rc=0)""#,
    );
    let task = Task::new("cover", Mode::Cover, 10).unwrap();

    let verdict = adapter(program)
        .run(&task, design(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict.outcome, Outcome::Passed);
    assert_eq!(
        verdict.cover.unwrap()["$cover$holds_1234"],
        CoverStatus::Reached(3)
    );
}

#[tokio::test]
async fn test_abnormal_exit_is_crash() {
    let bin = tempfile::tempdir().unwrap();
    let program = stub(bin.path(), "echo 'ERROR: solver not found' >&2\nexit 16");
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();

    let err = adapter(program)
        .run(&task, design(), CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        EngineError::Crash { code, detail } => {
            assert_eq!(code, Some(16));
            assert!(detail.contains("solver not found"));
        }
        other => panic!("expected crash, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_program_is_unavailable() {
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
    let adapter = adapter(PathBuf::from("/nonexistent/sby"));

    let err = adapter
        .run(&task, design(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unavailable(_)));
}

#[tokio::test]
async fn test_budget_stops_slow_run() {
    let bin = tempfile::tempdir().unwrap();
    let program = stub(bin.path(), "sleep 30\necho 'DONE (PASS, rc=0)'");
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
    let adapter = adapter(program);

    let verdict = supervise(
        &adapter,
        &task,
        design(),
        Duration::from_millis(200),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(verdict.outcome, Outcome::TimedOut);
    assert!(verdict.elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_cancel_stops_run() {
    let bin = tempfile::tempdir().unwrap();
    let program = stub(bin.path(), "sleep 30\necho 'DONE (PASS, rc=0)'");
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let verdict = adapter(program).run(&task, design(), cancel).await.unwrap();
    assert_eq!(verdict.outcome, Outcome::Cancelled);
}

#[tokio::test]
async fn test_kept_workdir_holds_job() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let program = stub(bin.path(), "echo 'DONE (PASS, rc=0)'");
    let adapter = SbyAdapter::new(
        EngineSpec::new("smtbmc", "z3"),
        AdapterSettings {
            program: Some(program),
            keep_workdir: true,
            workdir_root: Some(root.path().to_path_buf()),
        },
    );
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
    adapter.run(&task, design(), CancellationToken::new()).await.unwrap();

    let kept: Vec<PathBuf> = std::fs::read_dir(root.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(kept.len(), 1);
    let job = std::fs::read_to_string(kept[0].join("job.sby")).unwrap();
    assert!(job.contains("prep -top top"));
    assert!(kept[0].join("design.il").exists());
}

/// Stub that backgrounds a long sleep the way sby backgrounds its solvers,
/// recording the sleeper's pid in `pid_file`
fn stub_with_solver(dir: &Path, pid_file: &Path) -> PathBuf {
    stub(
        dir,
        &format!("sleep 60 &\necho $! > {}\nwait", pid_file.display()),
    )
}

async fn solver_pid(pid_file: &Path) -> i32 {
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(pid_file) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("solver pid never written to {}", pid_file.display());
}

fn alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if kill(Pid::from_raw(pid), None).is_err() {
        return false;
    }
    // a killed process waiting for its reaper is not running
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

async fn assert_stopped(pid: i32) {
    for _ in 0..100 {
        if !alive(pid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("solver process {} still running", pid);
}

#[tokio::test]
async fn test_cancel_kills_solver_processes() {
    let bin = tempfile::tempdir().unwrap();
    let pid_file = bin.path().join("solver.pid");
    let program = stub_with_solver(bin.path(), &pid_file);
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let watched = pid_file.clone();
    let pid = tokio::spawn(async move {
        let pid = solver_pid(&watched).await;
        trigger.cancel();
        pid
    });

    let verdict = adapter(program).run(&task, design(), cancel).await.unwrap();
    assert_eq!(verdict.outcome, Outcome::Cancelled);
    assert_stopped(pid.await.unwrap()).await;
}

#[tokio::test]
async fn test_budget_kills_solver_processes() {
    let bin = tempfile::tempdir().unwrap();
    let pid_file = bin.path().join("solver.pid");
    let program = stub_with_solver(bin.path(), &pid_file);
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();
    let adapter = adapter(program);

    let verdict = supervise(
        &adapter,
        &task,
        design(),
        Duration::from_millis(500),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(verdict.outcome, Outcome::TimedOut);
    assert_stopped(solver_pid(&pid_file).await).await;
}

#[tokio::test]
async fn test_kept_workdir_survives_budget_overrun() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let program = stub(bin.path(), "sleep 30\necho 'DONE (PASS, rc=0)'");
    let adapter = SbyAdapter::new(
        EngineSpec::new("smtbmc", "z3"),
        AdapterSettings {
            program: Some(program),
            keep_workdir: true,
            workdir_root: Some(root.path().to_path_buf()),
        },
    );
    let task = Task::new("bmc", Mode::Bmc, 10).unwrap();

    let verdict = supervise(
        &adapter,
        &task,
        design(),
        Duration::from_millis(200),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(verdict.outcome, Outcome::TimedOut);

    let kept: Vec<PathBuf> = std::fs::read_dir(root.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(kept.len(), 1);
    assert!(kept[0].join("job.sby").exists());
}
