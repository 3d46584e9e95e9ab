use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hwproof_config::HarnessConfig;
use hwproof_engine::HealthStatus;
use hwproof_harness::{Orchestrator, PreparedDesign, RunSettings, SBY_ENV};
use hwproof_techmap::{MatchPolicy, ReplacementTemplate, RewriteReport, Selector};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// hwproof - formal verification harness runner
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the design and run every task of a harness
    Run {
        /// Harness file (.sby or .toml)
        config: PathBuf,

        /// Maximum number of tasks running at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Budget in seconds for tasks without their own timeout
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Path to the sby program
        #[arg(long, env = SBY_ENV)]
        sby: Option<PathBuf>,

        /// Keep per-task working directories
        #[arg(long)]
        keep_workdir: bool,

        /// Parent directory for working directories
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse the harness and apply its rewrites without running any engine
    Check {
        /// Harness file (.sby or .toml)
        config: PathBuf,
    },

    /// Apply one rewrite to a design file
    Techmap {
        /// Design file (.il or .json)
        design: PathBuf,

        /// Cell selector, e.g. top/t:$dlatch/w:clk
        #[arg(short, long)]
        select: String,

        /// Replacement template
        #[arg(short, long, default_value = "dlatch2dff")]
        map: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON dump instead of RTLIL
        #[arg(long)]
        json: bool,
    },

    /// List the tasks of a harness
    Tasks {
        /// Harness file (.sby or .toml)
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            config,
            jobs,
            timeout,
            sby,
            keep_workdir,
            workdir,
            json,
        } => {
            let mut settings = RunSettings::default();
            if let Some(jobs) = jobs {
                settings.jobs = jobs;
            }
            if let Some(timeout) = timeout {
                settings.default_timeout = Duration::from_secs(timeout);
            }
            settings.sby_path = sby;
            settings.keep_workdir = keep_workdir;
            settings.workdir_root = workdir;
            run_harness(&config, settings, json)
        }

        Commands::Check { config } => check_harness(&config),

        Commands::Techmap {
            design,
            select,
            map,
            output,
            json,
        } => techmap_design(&design, &select, &map, output.as_ref(), json),

        Commands::Tasks { config } => list_tasks(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Run every task and report; the exit code reflects the verdicts
fn run_harness(config: &PathBuf, settings: RunSettings, json: bool) -> Result<ExitCode> {
    let orchestrator = Orchestrator::from_path(config, settings)
        .with_context(|| format!("Failed to load harness {:?}", config))?;
    let prepared = orchestrator.prepare().context("Failed to prepare design")?;
    print_rewrites(&prepared.rewrites);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let report = runtime.block_on(async {
        if let HealthStatus::Unavailable { reason } = orchestrator.adapter().health_check().await {
            warn!("Engine {} is unavailable: {}", orchestrator.adapter().name(), reason);
        }

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling running tasks");
                on_interrupt.cancel();
            }
        });

        orchestrator.dispatch(prepared, cancel).await
    })?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }
    Ok(ExitCode::from(report.exit_code() as u8))
}

/// Prepare the design and show what the rewrites did
fn check_harness(config: &PathBuf) -> Result<ExitCode> {
    info!("Checking harness {:?}", config);
    let orchestrator = Orchestrator::from_path(config, RunSettings::from_env())
        .with_context(|| format!("Failed to load harness {:?}", config))?;
    let PreparedDesign { design, rewrites } =
        orchestrator.prepare().context("Failed to prepare design")?;

    print_rewrites(&rewrites);
    if let Some(top) = design.top() {
        println!(
            "top module {}: {} cells, {} tasks ready",
            top.plain_name(),
            top.cells.len(),
            orchestrator.config().tasks.len()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn techmap_design(
    design: &PathBuf,
    selector: &str,
    template: &str,
    output: Option<&PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let loaded = hwproof_netlist::load_path(design)
        .with_context(|| format!("Failed to load design {:?}", design))?;
    let selector = Selector::parse(selector)?;
    let template = ReplacementTemplate::builtin(template)?;

    let rewritten = hwproof_techmap::rewrite(&loaded, &selector, &template, MatchPolicy::RequireAny)?;
    print_rewrites(std::slice::from_ref(&rewritten.report));

    let text = if json {
        rewritten.design.to_json()?
    } else {
        hwproof_netlist::write_rtlil(&rewritten.design)
    };
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("Wrote {:?}", path);
        }
        None => print!("{}", text),
    }
    Ok(ExitCode::SUCCESS)
}

fn list_tasks(config: &PathBuf) -> Result<ExitCode> {
    let config = HarnessConfig::load(config)
        .with_context(|| format!("Failed to load harness {:?}", config))?;

    println!("engine: {}", config.engine);
    for task in config.tasks.values() {
        let mut line = format!(
            "{:<12} {:<5} depth {:<4} multiclock {}",
            task.name,
            task.mode.as_str(),
            task.depth(),
            if task.options.multiclock { "on" } else { "off" }
        );
        if let Some(timeout) = task.options.timeout {
            line.push_str(&format!(" timeout {}s", timeout.as_secs()));
        }
        for (key, value) in &task.options.extra {
            line.push_str(&format!(" {} {}", key, value));
        }
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_rewrites(reports: &[RewriteReport]) {
    for report in reports {
        eprintln!(
            "{}: {} -> {} ({} cells)",
            report.namespace,
            report.selector,
            report.template,
            report.len()
        );
        for replacement in &report.replacements {
            eprintln!(
                "  {}: {} ({}) -> {} ({})",
                replacement.module,
                replacement.original,
                replacement.original_kind,
                replacement.name,
                replacement.kind
            );
            if !replacement.dropped_params.is_empty() {
                eprintln!("    dropped parameters: {}", replacement.dropped_params.join(", "));
            }
        }
    }
}
