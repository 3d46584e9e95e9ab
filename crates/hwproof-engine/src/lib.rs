//! Engine adapters for hwproof
//!
//! An [`EngineAdapter`] runs one task against a frozen design and produces a
//! [`Verdict`]. [`supervise`] wraps a run in the task lifecycle, applying the
//! time budget and cancellation. Two adapters are provided:
//! - [`SbyAdapter`] spawns SymbiYosys in a private working directory
//! - [`ScriptedAdapter`] answers with canned reports, for tests and dry runs

pub mod adapter;
pub mod error;
pub mod sby;
pub mod scripted;
pub mod state;
pub mod vcd;
pub mod verdict;

pub use adapter::{adapter_for, supervise, AdapterSettings, EngineAdapter, HealthStatus, SBY_BACKENDS};
pub use error::{EngineError, EngineResult};
pub use sby::{DoneStatus, OutputParser, SbyAdapter, SbyOutput};
pub use scripted::ScriptedAdapter;
pub use state::{TaskRun, TaskState};
pub use vcd::{Signal, Vcd};
pub use verdict::{BackendReport, BackendStatus, CoverStatus, CoverTable, Outcome, Trace, Verdict};
