//! Cell selectors
//!
//! A selector names a module scope and a list of predicates that must all
//! hold for a cell to be selected. The text form follows the usual
//! `module/predicate/predicate` shape:
//!
//! ```text
//! top/t:$dlatch/w:clk        latches in `top` attached to wire `clk`
//! */t:$dff/r:CLK_POLARITY=0  negative-edge flip-flops anywhere
//! top/p:EN=le/a:keep         cells whose EN port is driven by `le`
//! ```

use crate::error::{Result, RewriteError};
use hwproof_netlist::{escape, unescape, Cell, Const, Module};
use std::fmt;
use std::str::FromStr;

/// Which modules a selector looks into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleScope {
    Any,
    /// Module name with its RTLIL prefix
    Named(String),
}

impl ModuleScope {
    pub fn contains(&self, module: &Module) -> bool {
        match self {
            ModuleScope::Any => true,
            ModuleScope::Named(name) => *name == module.name,
        }
    }
}

/// One selector predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `t:<kind>`
    Kind(String),
    /// `w:<wire>`, some port is connected to the wire
    Wire(String),
    /// `p:<PORT>=<wire>`
    Port { port: String, wire: String },
    /// `r:<PARAM>=<value>`
    Param { name: String, value: Const },
    /// `a:<attr>`
    Attr(String),
}

impl Predicate {
    pub fn holds(&self, cell: &Cell) -> bool {
        match self {
            Predicate::Kind(kind) => cell.kind == *kind,
            Predicate::Wire(wire) => cell.connections.values().any(|sig| sig.references(wire)),
            Predicate::Port { port, wire } => cell
                .connection(port)
                .is_some_and(|sig| sig.references(wire)),
            Predicate::Param { name, value } => {
                cell.param(name).is_some_and(|v| v.same_value(value))
            }
            Predicate::Attr(attr) => cell.attributes.contains_key(attr),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Kind(kind) => write!(f, "t:{}", unescape(kind)),
            Predicate::Wire(wire) => write!(f, "w:{}", unescape(wire)),
            Predicate::Port { port, wire } => write!(f, "p:{}={}", unescape(port), unescape(wire)),
            Predicate::Param { name, value } => write!(f, "r:{}={}", unescape(name), value),
            Predicate::Attr(attr) => write!(f, "a:{}", unescape(attr)),
        }
    }
}

/// A module scope plus the predicates a cell must satisfy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub scope: ModuleScope,
    pub predicates: Vec<Predicate>,
}

impl Selector {
    pub fn new(scope: ModuleScope) -> Self {
        Self {
            scope,
            predicates: Vec::new(),
        }
    }

    /// Selector over one named module
    pub fn module(name: &str) -> Self {
        Self::new(ModuleScope::Named(escape(name)))
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn kind(self, kind: &str) -> Self {
        self.with(Predicate::Kind(escape(kind)))
    }

    pub fn wire(self, wire: &str) -> Self {
        self.with(Predicate::Wire(escape(wire)))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: String| RewriteError::InvalidSelector {
            selector: text.to_string(),
            reason,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(invalid("selector is empty".into()));
        }

        let mut segments = text.split('/').peekable();
        let scope = match segments.peek() {
            Some(first) if is_predicate(first) => ModuleScope::Any,
            Some(&"*") => {
                segments.next();
                ModuleScope::Any
            }
            Some(name) if !name.is_empty() => {
                let scope = ModuleScope::Named(escape(name));
                segments.next();
                scope
            }
            _ => return Err(invalid("missing module scope".into())),
        };

        let mut selector = Selector::new(scope);
        for segment in segments {
            selector.predicates.push(parse_predicate(segment).map_err(&invalid)?);
        }
        Ok(selector)
    }

    pub fn matches(&self, module: &Module, cell: &Cell) -> bool {
        self.scope.contains(module) && self.predicates.iter().all(|p| p.holds(cell))
    }

    /// Cell kinds named by `t:` predicates
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::Kind(kind) => Some(kind.as_str()),
            _ => None,
        })
    }
}

fn is_predicate(segment: &str) -> bool {
    matches!(
        segment.split_once(':'),
        Some(("t" | "w" | "p" | "r" | "a", _))
    )
}

fn parse_predicate(segment: &str) -> std::result::Result<Predicate, String> {
    let (prefix, body) = segment
        .split_once(':')
        .ok_or_else(|| format!("predicate `{}` has no `<prefix>:`", segment))?;
    if body.is_empty() {
        return Err(format!("predicate `{}` is empty", segment));
    }

    let assignment = || {
        body.split_once('=')
            .filter(|(lhs, rhs)| !lhs.is_empty() && !rhs.is_empty())
            .ok_or_else(|| format!("predicate `{}` expects `<name>=<value>`", segment))
    };

    match prefix {
        "t" => Ok(Predicate::Kind(escape(body))),
        "w" => Ok(Predicate::Wire(escape(body))),
        "p" => {
            let (port, wire) = assignment()?;
            Ok(Predicate::Port {
                port: escape(port),
                wire: escape(wire),
            })
        }
        "r" => {
            let (name, value) = assignment()?;
            Ok(Predicate::Param {
                name: escape(name),
                value: Const::from_str(value)?,
            })
        }
        "a" => Ok(Predicate::Attr(escape(body))),
        other => Err(format!("unknown predicate prefix `{}:`", other)),
    }
}

impl FromStr for Selector {
    type Err = RewriteError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            ModuleScope::Any => write!(f, "*")?,
            ModuleScope::Named(name) => write!(f, "{}", unescape(name))?,
        }
        for predicate in &self.predicates {
            write!(f, "/{}", predicate)?;
        }
        Ok(())
    }
}
