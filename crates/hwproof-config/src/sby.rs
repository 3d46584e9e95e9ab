//! Reader for `.sby` harness files
//!
//! ```text
//! [tasks]
//! bmc
//! cover
//!
//! [options]
//! bmc: mode bmc
//! cover: mode cover
//! depth 10
//!
//! [engines]
//! smtbmc z3
//! ```
//!
//! `[options]` lines without a prefix apply to every task; `name:` lines
//! apply to the listed tasks only. Lines are applied in order, so later lines
//! override earlier ones.

use crate::engine::EngineSpec;
use crate::error::{ConfigError, Result};
use crate::harness::HarnessConfig;
use crate::script::ScriptStep;
use crate::task::Task;
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::debug;

/// Task declared when a file has no `[tasks]` section
pub const DEFAULT_TASK: &str = "default";

const SECTIONS: &[&str] = &["tasks", "options", "engines", "script", "files"];

#[derive(Debug, Default)]
struct Section {
    line: usize,
    body: Vec<(usize, String)>,
}

fn split_sections(text: &str) -> Result<IndexMap<String, Section>> {
    let mut sections: IndexMap<String, Section> = IndexMap::new();
    let mut current: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .map(str::trim)
                .ok_or_else(|| ConfigError::syntax(number, "unterminated section header"))?;
            if !SECTIONS.contains(&name) {
                return Err(ConfigError::syntax(number, format!("unknown section [{}]", name)));
            }
            if sections.contains_key(name) {
                return Err(ConfigError::syntax(number, format!("section [{}] repeated", name)));
            }
            sections.insert(
                name.to_string(),
                Section {
                    line: number,
                    body: Vec::new(),
                },
            );
            current = Some(name.to_string());
            continue;
        }

        let section = current
            .as_ref()
            .and_then(|name| sections.get_mut(name))
            .ok_or_else(|| ConfigError::syntax(number, "text outside of any section"))?;
        section.body.push((number, line.to_string()));
    }

    Ok(sections)
}

/// Parse the `[tasks]` and `[options]` sections into validated tasks
pub fn parse_tasks(text: &str) -> Result<IndexMap<String, Task>> {
    let sections = split_sections(text)?;
    tasks_from_sections(&sections)
}

fn tasks_from_sections(sections: &IndexMap<String, Section>) -> Result<IndexMap<String, Task>> {
    let mut raw: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    match sections.get("tasks") {
        Some(section) => {
            for (_, line) in &section.body {
                // Extra words on a task line are tags
                let name = line.split_whitespace().next().unwrap_or_default();
                if raw.insert(name.to_string(), IndexMap::new()).is_some() {
                    return Err(ConfigError::DuplicateTask(name.to_string()));
                }
            }
            if raw.is_empty() {
                return Err(ConfigError::syntax(section.line, "[tasks] declares no tasks"));
            }
        }
        None => {
            raw.insert(DEFAULT_TASK.to_string(), IndexMap::new());
        }
    }

    if let Some(section) = sections.get("options") {
        for (number, line) in &section.body {
            let (targets, assignment) = match line.split_once(':') {
                Some((names, rest)) => (names.split_whitespace().collect::<Vec<_>>(), rest.trim()),
                None => (Vec::new(), line.as_str()),
            };

            let (key, value) = assignment
                .split_once(char::is_whitespace)
                .map(|(key, value)| (key, value.trim()))
                .filter(|(_, value)| !value.is_empty())
                .ok_or_else(|| ConfigError::syntax(*number, format!("expected `<key> <value>`, got `{}`", line)))?;

            if targets.is_empty() {
                for options in raw.values_mut() {
                    options.insert(key.to_string(), value.to_string());
                }
                continue;
            }
            for target in targets {
                let options = raw
                    .get_mut(target)
                    .ok_or_else(|| ConfigError::UnknownTask(target.to_string()))?;
                options.insert(key.to_string(), value.to_string());
            }
        }
    }

    let mut tasks = IndexMap::with_capacity(raw.len());
    for (name, options) in &raw {
        let task = Task::from_options(name, options)?;
        debug!("Task {}: {} depth {}", task.name, task.mode, task.depth());
        tasks.insert(name.clone(), task);
    }
    Ok(tasks)
}

/// Parse a complete `.sby` harness file
pub fn parse_sby(text: &str) -> Result<HarnessConfig> {
    let sections = split_sections(text)?;
    let tasks = tasks_from_sections(&sections)?;

    let engines = sections.get("engines").map(|s| s.body.as_slice()).unwrap_or_default();
    let engine = match engines {
        [] => return Err(ConfigError::MissingEngine),
        [(_, line)] => EngineSpec::parse_line(line)?,
        [_, (number, _), ..] => {
            return Err(ConfigError::InvalidEngine(format!(
                "a second engine is declared at line {}, only one is supported",
                number
            )))
        }
    };

    let script = sections
        .get("script")
        .map(|section| {
            section
                .body
                .iter()
                .map(|(number, line)| ScriptStep::parse(*number, line))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    let files = sections
        .get("files")
        .map(|section| section.body.iter().map(|(_, line)| PathBuf::from(line)).collect())
        .unwrap_or_default();

    let config = HarnessConfig {
        tasks,
        engine,
        script,
        files,
        templates: IndexMap::new(),
    };
    config.validate()?;
    Ok(config)
}
