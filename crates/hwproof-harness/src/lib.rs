//! Harness orchestration for hwproof
//!
//! An [`Orchestrator`] takes a parsed harness, prepares its design (reads the
//! design files, applies canonicalization rewrites, selects the top module)
//! and runs every task through an engine adapter. The design is frozen before
//! dispatch and shared read-only by all tasks.
//!
//! ```ignore
//! let orchestrator = Orchestrator::from_path("TransparentLatch.sby", RunSettings::from_env())?;
//! let report = orchestrator.run(CancellationToken::new()).await?;
//! println!("{}", report.render());
//! std::process::exit(report.exit_code());
//! ```

pub mod error;
pub mod orchestrator;
pub mod prepare;
pub mod report;
pub mod settings;

pub use error::{HarnessError, Result};
pub use orchestrator::Orchestrator;
pub use prepare::{prepare, PreparedDesign};
pub use report::{RunReport, TaskResult};
pub use settings::{RunSettings, SBY_ENV};
