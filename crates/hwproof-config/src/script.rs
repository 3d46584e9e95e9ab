//! Preprocessing script steps

use crate::error::{ConfigError, Result};
use hwproof_techmap::Selector;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignFormat {
    Rtlil,
    Json,
}

/// One preprocessing step, run in order before any task is dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Load a design file and merge its modules
    Read { format: DesignFormat, file: String },
    /// Rewrite the cells a selector picks with a named template
    Canonicalize { selector: Selector, template: String },
    SelectTop(String),
}

impl ScriptStep {
    /// Parse one script command; `line` is used for error reporting
    pub fn parse(line: usize, text: &str) -> Result<Self> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Err(ConfigError::syntax(line, "empty script command"));
        };

        let single = |what: &str| match args {
            [arg] => Ok(arg.to_string()),
            _ => Err(ConfigError::syntax(
                line,
                format!("`{}` expects exactly one {}", command, what),
            )),
        };

        match command {
            "read_rtlil" | "read_ilang" => Ok(ScriptStep::Read {
                format: DesignFormat::Rtlil,
                file: single("file")?,
            }),
            "read_json" => Ok(ScriptStep::Read {
                format: DesignFormat::Json,
                file: single("file")?,
            }),
            "techmap" => match args {
                ["-map", template, selector] => Ok(ScriptStep::Canonicalize {
                    selector: Selector::parse(selector)?,
                    template: template.to_string(),
                }),
                _ => Err(ConfigError::syntax(
                    line,
                    "`techmap` expects `-map <template> <selector>`",
                )),
            },
            "prep" | "hierarchy" => match args {
                ["-top", top] => Ok(ScriptStep::SelectTop(top.to_string())),
                _ => Err(ConfigError::syntax(
                    line,
                    format!("`{}` expects `-top <module>`", command),
                )),
            },
            other => Err(ConfigError::UnknownCommand {
                line,
                command: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStep::Read {
                format: DesignFormat::Rtlil,
                file,
            } => write!(f, "read_rtlil {}", file),
            ScriptStep::Read {
                format: DesignFormat::Json,
                file,
            } => write!(f, "read_json {}", file),
            ScriptStep::Canonicalize { selector, template } => {
                write!(f, "techmap -map {} {}", template, selector)
            }
            ScriptStep::SelectTop(top) => write!(f, "prep -top {}", top),
        }
    }
}
