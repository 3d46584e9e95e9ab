//! Replacement templates
//!
//! A template describes the cell a matched cell turns into: the target kind,
//! how ports are renamed, how parameters carry over, and the port and
//! parameter sets the target keeps.

use crate::error::{Result, RewriteError};
use hwproof_netlist::{escape, unescape, CellLibrary, Const};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How one source parameter is carried to the replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ParamRule {
    Rename { from: String, to: String },
    /// Rename a one-bit polarity parameter and flip its value
    RenameInverted { from: String, to: String },
    Drop { name: String },
}

impl ParamRule {
    pub fn source(&self) -> &str {
        match self {
            ParamRule::Rename { from, .. } | ParamRule::RenameInverted { from, .. } => from,
            ParamRule::Drop { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementTemplate {
    #[serde(default)]
    pub name: String,
    /// Kind of the replacement cell
    pub kind: String,
    /// Source port name to target port name
    #[serde(default)]
    pub port_renames: IndexMap<String, String>,
    /// Ports the target keeps; empty keeps every port
    #[serde(default)]
    pub ports: Vec<String>,
    /// Parameters the target keeps; empty keeps every parameter
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub param_rules: Vec<ParamRule>,
    /// Values forced onto the replacement after the rules ran
    #[serde(default)]
    pub overrides: IndexMap<String, Const>,
}

/// Names accepted by [`ReplacementTemplate::builtin`]
pub const BUILTIN_TEMPLATES: &[&str] = &["dlatch2dff", "adlatch2adff"];

impl ReplacementTemplate {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: escape(&kind.into()),
            port_renames: IndexMap::new(),
            ports: Vec::new(),
            params: Vec::new(),
            param_rules: Vec::new(),
            overrides: IndexMap::new(),
        }
    }

    /// Look up a template shipped with the rewriter
    ///
    /// Both builtins turn a level-sensitive latch into a flip-flop clocked by
    /// the latch enable. The flip-flop samples on the edge that closes the
    /// latch, so the clock polarity is the inverse of the enable polarity.
    pub fn builtin(name: &str) -> Result<Self> {
        let library = CellLibrary::builtin();
        let template = match name {
            "dlatch2dff" => Self::new(name, "$dff")
                .rename_port("EN", "CLK")
                .with_rule(ParamRule::RenameInverted {
                    from: "EN_POLARITY".into(),
                    to: "CLK_POLARITY".into(),
                }),
            "adlatch2adff" => Self::new(name, "$adff")
                .rename_port("EN", "CLK")
                .with_rule(ParamRule::RenameInverted {
                    from: "EN_POLARITY".into(),
                    to: "CLK_POLARITY".into(),
                }),
            _ => return Err(RewriteError::UnknownTemplate(name.to_string())),
        };
        Ok(template.complete(&library))
    }

    pub fn rename_port(mut self, from: &str, to: &str) -> Self {
        self.port_renames.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_rule(mut self, rule: ParamRule) -> Self {
        self.param_rules.push(rule);
        self
    }

    pub fn with_override(mut self, name: &str, value: Const) -> Self {
        self.overrides.insert(name.to_string(), value);
        self
    }

    /// Fill empty port and parameter sets from the target kind's schema
    ///
    /// A bare kind names a user module and gets its `\` prefix here.
    pub fn complete(mut self, library: &CellLibrary) -> Self {
        self.kind = escape(&self.kind);
        if let Some(schema) = library.get(&self.kind) {
            if self.ports.is_empty() {
                self.ports = schema.ports.iter().map(|p| p.to_string()).collect();
            }
            if self.params.is_empty() {
                self.params = schema.params.iter().map(|p| p.to_string()).collect();
            }
        }
        self
    }

    /// Target name for a source port
    pub fn port_name<'a>(&'a self, port: &'a str) -> &'a str {
        let port = unescape(port);
        self.port_renames
            .get(port)
            .map(String::as_str)
            .unwrap_or(port)
    }

    pub fn keeps_port(&self, port: &str) -> bool {
        self.ports.is_empty() || self.ports.iter().any(|p| p == unescape(port))
    }

    pub fn keeps_param(&self, param: &str) -> bool {
        self.params.is_empty() || self.params.iter().any(|p| p == unescape(param))
    }

    pub fn rule_for(&self, param: &str) -> Option<&ParamRule> {
        let param = unescape(param);
        self.param_rules.iter().find(|rule| rule.source() == param)
    }
}
