//! Adapter driving the SymbiYosys `sby` front end
//!
//! Each invocation gets a private working directory holding `design.il` and
//! `job.sby`. `sby -f job.sby` is spawned there, its stdout is parsed line by
//! line, and counterexample traces are read from the VCD files it reports.

use crate::adapter::{AdapterSettings, EngineAdapter, HealthStatus};
use crate::error::{EngineError, EngineResult};
use crate::vcd::Vcd;
use crate::verdict::{BackendReport, BackendStatus, CoverStatus, Verdict};
use async_trait::async_trait;
use hwproof_config::{EngineSpec, Mode, Task};
use hwproof_netlist::{unescape, write_rtlil, Design};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const JOB_NAME: &str = "job";
const DESIGN_FILE: &str = "design.il";

pub struct SbyAdapter {
    spec: EngineSpec,
    settings: AdapterSettings,
}

impl SbyAdapter {
    pub fn new(spec: EngineSpec, settings: AdapterSettings) -> Self {
        Self { spec, settings }
    }

    fn locate(&self) -> EngineResult<PathBuf> {
        self.settings
            .program
            .clone()
            .or_else(|| which::which("sby").ok())
            .ok_or_else(|| EngineError::Unavailable("sby not found on PATH".to_string()))
    }

    /// Job file for one task against a design whose top is `top`
    pub fn render_job(&self, task: &Task, top: &str) -> String {
        let mut sby = String::new();
        sby.push_str("[options]\n");
        sby.push_str(&format!("mode {}\n", task.mode));
        sby.push_str(&format!("depth {}\n", task.depth()));
        sby.push_str(&format!(
            "multiclock {}\n",
            if task.options.multiclock { "on" } else { "off" }
        ));
        for (key, value) in &task.options.extra {
            sby.push_str(&format!("{} {}\n", key, value));
        }

        sby.push_str("\n[engines]\n");
        sby.push_str(&format!("{}\n", self.spec));

        sby.push_str("\n[script]\n");
        sby.push_str(&format!("read_rtlil {}\n", DESIGN_FILE));
        sby.push_str(&format!("prep -top {}\n", unescape(top)));

        sby.push_str("\n[files]\n");
        sby.push_str(&format!("{}\n", DESIGN_FILE));
        sby
    }

    fn workdir(&self, task: &Task) -> EngineResult<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        let prefix = format!("hwproof-{}-", task.name);
        builder.prefix(&prefix);
        let dir = match &self.settings.workdir_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn execute(
        &self,
        task: &Task,
        design: &Design,
        dir: &Path,
        cancel: CancellationToken,
    ) -> EngineResult<Verdict> {
        let start = Instant::now();
        let program = self.locate()?;
        let top = design
            .top()
            .ok_or_else(|| EngineError::InvalidDesign("no top module selected".to_string()))?;

        std::fs::write(dir.join(DESIGN_FILE), write_rtlil(design))?;
        std::fs::write(dir.join(format!("{}.sby", JOB_NAME)), self.render_job(task, &top.name))?;

        let mut cmd = Command::new(&program);
        cmd.arg("-f")
            .arg(format!("{}.sby", JOB_NAME))
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            EngineError::Unavailable(format!("failed to spawn {}: {}", program.display(), e))
        })?;
        let mut group = ProcessGroup::of(&child);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Io("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Io("failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        });

        let declared = top
            .cells_of_kind("$cover")
            .map(|cell| unescape(&cell.name).to_string())
            .collect();
        let mut parser = OutputParser::new(declared);
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    group.kill();
                    let _ = child.kill().await;
                    info!("Task {} cancelled, sby stopped", task.name);
                    return Ok(Verdict::cancelled(task, start.elapsed()));
                }
                line = lines.next_line() => match line? {
                    Some(line) => {
                        debug!("{}: {}", task.name, line);
                        parser.feed(&line);
                    }
                    None => break,
                },
            }
        }

        let status = child.wait().await?;
        group.release();
        let stderr = stderr_task.await.unwrap_or_default();
        let output = parser.finish(status, &stderr)?;
        let report = output.into_report(task, &dir.join(JOB_NAME))?;
        Verdict::conclude(task, report, start.elapsed())
    }
}

#[async_trait]
impl EngineAdapter for SbyAdapter {
    fn name(&self) -> &str {
        "sby"
    }

    async fn run(
        &self,
        task: &Task,
        design: Arc<Design>,
        cancel: CancellationToken,
    ) -> EngineResult<Verdict> {
        // A kept directory is detached up front so it also survives a run
        // whose future is dropped on timeout or cancellation.
        let dir = self.workdir(task)?;
        let (path, _temp) = if self.settings.keep_workdir {
            let kept = dir.into_path();
            info!("Task {} keeps working directory {}", task.name, kept.display());
            (kept, None)
        } else {
            (dir.path().to_path_buf(), Some(dir))
        };
        debug!("Task {} working in {}", task.name, path.display());
        self.execute(task, &design, &path, cancel).await
    }

    async fn health_check(&self) -> HealthStatus {
        match self.locate() {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

/// Process group of a spawned backend
///
/// sby runs yosys and the solvers as its children. They share its group, so
/// the whole group is killed when the run is cancelled or its future dropped.
struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<nix::unistd::Pid>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn of(child: &tokio::process::Child) -> Self {
        Self {
            pgid: child.id().map(|pid| nix::unistd::Pid::from_raw(pid as i32)),
        }
    }

    #[cfg(not(unix))]
    fn of(_child: &tokio::process::Child) -> Self {
        Self {}
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        use nix::sys::signal::{killpg, Signal};

        if let Some(pgid) = self.pgid.take() {
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) => debug!("Killed process group {}", pgid),
                Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => warn!("Failed to kill process group {}: {}", pgid, e),
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {}

    /// Forget the group once its leader has been reaped normally
    #[cfg(unix)]
    fn release(&mut self) {
        self.pgid = None;
    }

    #[cfg(not(unix))]
    fn release(&mut self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Final status line of an sby run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneStatus {
    Pass,
    Fail,
    Unknown,
    Timeout,
    Error,
}

/// What was learned from an sby run's output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SbyOutput {
    pub done: Option<(DoneStatus, i32)>,
    /// Step of the first failed assertion
    pub failed_step: Option<u32>,
    pub cover: indexmap::IndexMap<String, CoverStatus>,
    /// Trace files in report order, relative to the job directory
    pub traces: Vec<PathBuf>,
    pub diagnostics: Vec<String>,
}

impl SbyOutput {
    /// Map the parsed output to a backend report, reading the failing trace
    pub fn into_report(self, task: &Task, job_dir: &Path) -> EngineResult<BackendReport> {
        let status = match self.done {
            Some((DoneStatus::Pass, _)) => BackendStatus::Pass,
            Some((DoneStatus::Fail, _)) => BackendStatus::Fail,
            Some((DoneStatus::Unknown, _)) => BackendStatus::Unknown,
            Some((DoneStatus::Timeout, _)) => BackendStatus::TimedOut,
            Some((DoneStatus::Error, code)) => {
                return Err(EngineError::Crash {
                    code: Some(code),
                    detail: self.diagnostics.join("\n"),
                })
            }
            None => {
                return Err(EngineError::Crash {
                    code: None,
                    detail: "sby ended without a DONE line".to_string(),
                })
            }
        };

        let mut report = BackendReport::new(status);
        report.cover = self.cover;
        report.diagnostics = self.diagnostics;

        if status == BackendStatus::Fail && task.mode == Mode::Bmc {
            let step = self.failed_step.ok_or_else(|| {
                EngineError::Protocol("assertion failure reported without a step".to_string())
            })?;
            let path = self.traces.first().ok_or_else(|| {
                EngineError::Protocol("assertion failure reported without a trace file".to_string())
            })?;
            let path = resolve_trace(path, job_dir);
            let text = std::fs::read_to_string(&path).map_err(|e| {
                warn!("Cannot read trace {}: {}", path.display(), e);
                EngineError::Protocol(format!("unreadable trace {}: {}", path.display(), e))
            })?;
            report.trace = Some(Vcd::parse(&text)?.trace(step as usize + 1));
        }
        Ok(report)
    }
}

struct Patterns {
    step: Regex,
    assert_failed: Regex,
    reached: Regex,
    unreached: Regex,
    trace: Regex,
    done: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        step: Regex::new(r"Checking \w+(?: \w+)* in step (\d+)").unwrap(),
        assert_failed: Regex::new(r"Assert failed in (\S+)").unwrap(),
        reached: Regex::new(r"Reached cover statement at (\S+)(?: \(([^)]+)\))? in step (\d+)").unwrap(),
        unreached: Regex::new(r"Unreached cover statement at (\S+)(?: \(([^)]+)\))?").unwrap(),
        trace: Regex::new(r"Writing trace to VCD file: (\S+)").unwrap(),
        done: Regex::new(r"DONE \((PASS|FAIL|UNKNOWN|TIMEOUT|ERROR), rc=(\d+)\)").unwrap(),
    })
}

/// Incremental parser for sby stdout
#[derive(Debug, Default)]
pub struct OutputParser {
    output: SbyOutput,
    current_step: Option<u32>,
}

impl OutputParser {
    /// `declared` lists the design's cover points, all unreached initially
    pub fn new(declared: Vec<String>) -> Self {
        let mut parser = Self::default();
        for id in declared {
            parser.output.cover.insert(id, CoverStatus::Unreached);
        }
        parser
    }

    pub fn feed(&mut self, line: &str) {
        let p = patterns();

        if let Some(caps) = p.step.captures(line) {
            self.current_step = caps[1].parse().ok();
        } else if let Some(caps) = p.assert_failed.captures(line) {
            if self.output.failed_step.is_none() {
                self.output.failed_step = self.current_step;
            }
            self.output.diagnostics.push(format!("assert failed in {}", &caps[1]));
        } else if let Some(caps) = p.reached.captures(line) {
            let id = cover_id(caps.get(1), caps.get(2));
            if let Ok(step) = caps[3].parse() {
                self.output.cover.insert(id, CoverStatus::Reached(step));
            }
        } else if let Some(caps) = p.unreached.captures(line) {
            let id = cover_id(caps.get(1), caps.get(2));
            self.output.cover.entry(id).or_insert(CoverStatus::Unreached);
        } else if let Some(caps) = p.trace.captures(line) {
            self.output.traces.push(PathBuf::from(&caps[1]));
        } else if let Some(caps) = p.done.captures(line) {
            let status = match &caps[1] {
                "PASS" => DoneStatus::Pass,
                "FAIL" => DoneStatus::Fail,
                "UNKNOWN" => DoneStatus::Unknown,
                "TIMEOUT" => DoneStatus::Timeout,
                _ => DoneStatus::Error,
            };
            let code = caps[2].parse().unwrap_or(-1);
            self.output.done = Some((status, code));
        } else if line.contains("ERROR") {
            self.output.diagnostics.push(line.trim().to_string());
        }
    }

    /// Combine the parsed stdout with the exit status and stderr
    pub fn finish(mut self, status: ExitStatus, stderr: &[String]) -> EngineResult<SbyOutput> {
        self.output
            .diagnostics
            .extend(stderr.iter().filter(|l| !l.trim().is_empty()).cloned());

        if status.code().is_none() {
            return Err(EngineError::Crash {
                code: None,
                detail: self.output.diagnostics.join("\n"),
            });
        }
        if self.output.done.is_none() {
            return Err(EngineError::Crash {
                code: status.code(),
                detail: if self.output.diagnostics.is_empty() {
                    "sby exited without a DONE line".to_string()
                } else {
                    self.output.diagnostics.join("\n")
                },
            });
        }
        Ok(self.output)
    }

    pub fn output(&self) -> &SbyOutput {
        &self.output
    }
}

/// Trace paths are relative to the job directory, or to its parent for
/// older front ends
fn resolve_trace(path: &Path, job_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let in_job = job_dir.join(path);
    match job_dir.parent() {
        Some(parent) if !in_job.exists() && parent.join(path).exists() => parent.join(path),
        _ => in_job,
    }
}

/// Cover points are named by their cell name when sby prints it, otherwise by
/// source location. Cell names come back with their RTLIL prefix stripped.
fn cover_id(location: Option<regex::Match<'_>>, name: Option<regex::Match<'_>>) -> String {
    name.or(location)
        .map(|m| unescape(m.as_str()).to_string())
        .unwrap_or_default()
}
