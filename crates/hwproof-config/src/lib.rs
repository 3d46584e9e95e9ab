//! Harness configuration for hwproof
//!
//! This crate reads the two harness formats:
//! - SymbiYosys-style `.sby` files ([`parse_sby`], [`parse_tasks`])
//! - An equivalent TOML manifest ([`HarnessConfig::from_toml_str`])
//!
//! Both produce the same [`HarnessConfig`] and run the same validation.

pub mod engine;
pub mod error;
pub mod harness;
pub mod sby;
pub mod script;
pub mod task;

pub use engine::{EngineSpec, DEFAULT_SOLVER};
pub use error::{ConfigError, Result};
pub use harness::HarnessConfig;
pub use sby::{parse_sby, parse_tasks, DEFAULT_TASK};
pub use script::{DesignFormat, ScriptStep};
pub use task::{parse_bool, Mode, Task, TaskOptions, PASSTHROUGH_OPTIONS};
