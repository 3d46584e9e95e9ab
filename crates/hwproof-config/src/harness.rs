//! Complete harness configuration

use crate::engine::EngineSpec;
use crate::error::{ConfigError, Result};
use crate::script::ScriptStep;
use crate::task::Task;
use hwproof_netlist::CellLibrary;
use hwproof_techmap::{ReplacementTemplate, RewriteError, BUILTIN_TEMPLATES};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a harness file declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub tasks: IndexMap<String, Task>,
    pub engine: EngineSpec,
    pub script: Vec<ScriptStep>,
    /// Design sources, relative to the harness file
    pub files: Vec<PathBuf>,
    /// Templates declared next to the builtins
    pub templates: IndexMap<String, ReplacementTemplate>,
}

/// TOML shape of a harness
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHarness {
    #[serde(default)]
    files: Vec<PathBuf>,
    #[serde(default)]
    script: Vec<String>,
    engine: Option<EngineSpec>,
    #[serde(default)]
    tasks: IndexMap<String, IndexMap<String, toml::Value>>,
    #[serde(default)]
    templates: IndexMap<String, ReplacementTemplate>,
}

impl HarnessConfig {
    /// Load a `.sby` or `.toml` harness file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("sby") => crate::sby::parse_sby(&text)?,
            Some("toml") => Self::from_toml_str(&text)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };
        info!(
            "Loaded harness {} with {} task(s)",
            path.display(),
            config.tasks.len()
        );
        Ok(config)
    }

    /// Parse the TOML form of a harness
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawHarness = toml::from_str(text).map_err(|e| ConfigError::Toml(e.to_string()))?;

        if raw.tasks.is_empty() {
            return Err(ConfigError::Toml("no tasks declared".into()));
        }
        let mut tasks = IndexMap::with_capacity(raw.tasks.len());
        for (name, values) in &raw.tasks {
            let mut options = IndexMap::with_capacity(values.len());
            for (key, value) in values {
                options.insert(key.clone(), option_text(name, key, value)?);
            }
            tasks.insert(name.clone(), Task::from_options(name, &options)?);
        }

        let script = raw
            .script
            .iter()
            .enumerate()
            .map(|(index, line)| ScriptStep::parse(index + 1, line))
            .collect::<Result<Vec<_>>>()?;

        let library = CellLibrary::builtin();
        let templates = raw
            .templates
            .into_iter()
            .map(|(name, mut template)| {
                template.name = name.clone();
                (name, template.complete(&library))
            })
            .collect();

        let config = Self {
            tasks,
            engine: raw.engine.ok_or(ConfigError::MissingEngine)?,
            script,
            files: raw.files,
            templates,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-section references
    pub fn validate(&self) -> Result<()> {
        for step in &self.script {
            if let ScriptStep::Canonicalize { template, .. } = step {
                if !self.templates.contains_key(template)
                    && !BUILTIN_TEMPLATES.contains(&template.as_str())
                {
                    return Err(ConfigError::UnknownTemplate(template.clone()));
                }
            }
        }
        Ok(())
    }

    /// Resolve a template name, preferring templates declared in the harness
    pub fn template(&self, name: &str) -> Result<ReplacementTemplate> {
        if let Some(template) = self.templates.get(name) {
            return Ok(template.clone());
        }
        ReplacementTemplate::builtin(name).map_err(|e| match e {
            RewriteError::UnknownTemplate(name) => ConfigError::UnknownTemplate(name),
            other => ConfigError::Selector(other),
        })
    }
}

fn option_text(task: &str, key: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(text) => Ok(text.clone()),
        toml::Value::Integer(number) => Ok(number.to_string()),
        toml::Value::Boolean(flag) => Ok(if *flag { "on" } else { "off" }.to_string()),
        other => Err(ConfigError::InvalidOption {
            task: task.to_string(),
            option: key.to_string(),
            value: other.to_string(),
            reason: "expected a string, integer or boolean".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Mode;
    use hwproof_netlist::Const;
    use hwproof_techmap::ParamRule;
    use std::time::Duration;

    #[test]
    fn test_toml_harness() {
        let config = HarnessConfig::from_toml_str(
            r#"
            files = ["latch.il"]
            script = ["read_rtlil latch.il", "techmap -map dlatch2dff top/t:$dlatch/w:clk", "prep -top top"]

            [engine]
            backend = "smtbmc"

            [tasks.bmc]
            mode = "bmc"
            depth = 20
            timeout = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.solver, "yices");
        assert_eq!(config.tasks["bmc"].mode, Mode::Bmc);
        assert_eq!(config.tasks["bmc"].options.timeout, Some(Duration::from_secs(60)));
        assert!(!config.tasks["bmc"].options.multiclock);
        assert_eq!(config.template("dlatch2dff").unwrap().kind, "$dff");
    }

    #[test]
    fn test_inline_template() {
        let config = HarnessConfig::from_toml_str(
            r#"
            script = ["techmap -map negff top/t:$dlatch"]

            [engine]
            backend = "smtbmc"
            solver = "z3"

            [tasks.bmc]
            mode = "bmc"
            depth = 5

            [templates.negff]
            kind = "$dff"
            port_renames = { EN = "CLK" }
            param_rules = [{ rule = "drop", name = "EN_POLARITY" }]
            overrides = { CLK_POLARITY = { Int = 0 } }
            "#,
        )
        .unwrap();

        let template = config.template("negff").unwrap();
        assert_eq!(template.name, "negff");
        assert_eq!(template.ports, vec!["CLK", "D", "Q"]);
        assert_eq!(
            template.param_rules,
            vec![ParamRule::Drop {
                name: "EN_POLARITY".into()
            }]
        );
        assert_eq!(template.overrides.get("CLK_POLARITY"), Some(&Const::Int(0)));
    }

    #[test]
    fn test_template_kind_names_user_module() {
        let config = HarnessConfig::from_toml_str(
            r#"
            script = ["techmap -map wrap top/t:$dlatch"]

            [engine]
            backend = "smtbmc"

            [tasks.bmc]
            mode = "bmc"
            depth = 5

            [templates.wrap]
            kind = "my_ff"
            "#,
        )
        .unwrap();
        assert_eq!(config.template("wrap").unwrap().kind, "\\my_ff");
    }

    #[test]
    fn test_toml_errors() {
        assert!(matches!(
            HarnessConfig::from_toml_str("[engine]\nbackend = \"smtbmc\"\n"),
            Err(ConfigError::Toml(_))
        ));
        assert_eq!(
            HarnessConfig::from_toml_str("[tasks.bmc]\nmode = \"bmc\"\ndepth = 3\n").unwrap_err(),
            ConfigError::MissingEngine
        );
        assert!(matches!(
            HarnessConfig::from_toml_str(
                "[engine]\nbackend = \"smtbmc\"\n[tasks.bmc]\nmode = \"bmc\"\ndepth = 3.5\n"
            ),
            Err(ConfigError::InvalidOption { .. })
        ));
        assert!(matches!(
            HarnessConfig::from_toml_str(
                "[engine]\nbackend = \"smtbmc\"\n[tasks.bmc]\nmode = \"bmc\"\ndepth = -1\n"
            ),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.yaml");
        std::fs::write(&path, "tasks: []").unwrap();
        assert_eq!(
            HarnessConfig::load(&path).unwrap_err(),
            ConfigError::UnsupportedFormat("yaml".into())
        );
    }
}
