use hwproof_engine::AdapterSettings;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the `sby` program
pub const SBY_ENV: &str = "HWPROOF_SBY";

/// Settings of one harness run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Maximum number of tasks running at once
    pub jobs: usize,
    /// Budget for tasks without their own `timeout` option
    pub default_timeout: Duration,
    /// Keep per-task working directories after the run
    pub keep_workdir: bool,
    /// Parent directory for working directories
    pub workdir_root: Option<PathBuf>,
    /// `sby` program; `PATH` lookup when unset
    pub sby_path: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
            default_timeout: Duration::from_secs(300), // 5 minutes
            keep_workdir: false,
            workdir_root: None,
            sby_path: None,
        }
    }
}

impl RunSettings {
    /// Defaults with the program path taken from `HWPROOF_SBY`
    pub fn from_env() -> Self {
        Self {
            sby_path: std::env::var_os(SBY_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    pub fn to_adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            program: self.sby_path.clone(),
            keep_workdir: self.keep_workdir,
            workdir_root: self.workdir_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RunSettings::default();
        assert!(settings.jobs >= 1);
        assert_eq!(settings.default_timeout, Duration::from_secs(300));

        let adapter = RunSettings {
            sby_path: Some(PathBuf::from("/opt/sby")),
            keep_workdir: true,
            ..settings
        }
        .to_adapter_settings();
        assert_eq!(adapter.program, Some(PathBuf::from("/opt/sby")));
        assert!(adapter.keep_workdir);
    }
}
