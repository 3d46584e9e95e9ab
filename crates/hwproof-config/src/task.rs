//! Verification tasks and their options

use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

/// Options passed to the backend unchanged
pub const PASSTHROUGH_OPTIONS: &[&str] = &["append", "skip", "vcd"];

/// Verification mode of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Bounded model checking of the assertions
    Bmc,
    /// Reachability of the cover points
    Cover,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Bmc => "bmc",
            Mode::Cover => "cover",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bmc" => Ok(Mode::Bmc),
            "cover" => Ok(Mode::Cover),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    /// Step bound; the reachability horizon for cover tasks
    pub depth: NonZeroU32,
    /// Treat clock domains as independently phased
    pub multiclock: bool,
    pub timeout: Option<Duration>,
    pub extra: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub mode: Mode,
    pub options: TaskOptions,
}

impl Task {
    pub fn new(name: impl Into<String>, mode: Mode, depth: u32) -> Result<Self> {
        let name = name.into();
        let depth = NonZeroU32::new(depth).ok_or_else(|| ConfigError::InvalidOption {
            task: name.clone(),
            option: "depth".into(),
            value: depth.to_string(),
            reason: "depth must be positive".into(),
        })?;
        Ok(Self {
            name,
            mode,
            options: TaskOptions {
                depth,
                multiclock: false,
                timeout: None,
                extra: IndexMap::new(),
            },
        })
    }

    pub fn with_multiclock(mut self, multiclock: bool) -> Self {
        self.options.multiclock = multiclock;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn depth(&self) -> u32 {
        self.options.depth.get()
    }

    /// Build a task from raw `key -> value` option text
    ///
    /// Every harness format funnels through here so validation is shared.
    pub fn from_options(name: &str, options: &IndexMap<String, String>) -> Result<Self> {
        let invalid = |option: &str, value: &str, reason: &str| ConfigError::InvalidOption {
            task: name.to_string(),
            option: option.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let missing = |option: &str| ConfigError::MissingOption {
            task: name.to_string(),
            option: option.to_string(),
        };

        let mode_text = options.get("mode").ok_or_else(|| missing("mode"))?;
        let mode = mode_text
            .parse::<Mode>()
            .map_err(|mode| ConfigError::UnknownMode {
                task: name.to_string(),
                mode,
            })?;

        let depth_text = options.get("depth").ok_or_else(|| missing("depth"))?;
        let depth = depth_text
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| invalid("depth", depth_text, "expected a positive integer"))?;

        let multiclock = match options.get("multiclock") {
            Some(value) => parse_bool(value)
                .ok_or_else(|| invalid("multiclock", value, "expected on or off"))?,
            None => false,
        };

        let timeout = match options.get("timeout") {
            Some(value) => Some(
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| invalid("timeout", value, "expected a positive number of seconds"))?,
            ),
            None => None,
        };

        let mut extra = IndexMap::new();
        for (key, value) in options {
            match key.as_str() {
                "mode" | "depth" | "multiclock" | "timeout" => {}
                key if PASSTHROUGH_OPTIONS.contains(&key) => {
                    extra.insert(key.to_string(), value.clone());
                }
                _ => {
                    return Err(ConfigError::UnknownOption {
                        task: name.to_string(),
                        option: key.clone(),
                    })
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            mode,
            options: TaskOptions {
                depth,
                multiclock,
                timeout,
                extra,
            },
        })
    }
}

/// Parse the boolean spellings accepted in option values
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
