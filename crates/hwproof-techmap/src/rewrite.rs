//! Selector-driven cell replacement

use crate::error::{Result, RewriteError};
use crate::selector::Selector;
use crate::template::{ParamRule, ReplacementTemplate};
use hwproof_netlist::{escape, unescape, Cell, CellLibrary, Design, Module};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What to do when a selector matches nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Zero matches is [`RewriteError::NoMatch`]
    #[default]
    RequireAny,
    AllowNone,
}

/// One replaced cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub module: String,
    pub original: String,
    pub original_kind: String,
    pub name: String,
    pub kind: String,
    pub dropped_ports: Vec<String>,
    pub dropped_params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub namespace: String,
    pub selector: String,
    pub template: String,
    pub replacements: Vec<Replacement>,
}

impl RewriteReport {
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// Output of a rewrite: the new design and what changed
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub design: Design,
    pub report: RewriteReport,
}

/// Rewrites designs against a cell library
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    library: CellLibrary,
}

impl Rewriter {
    pub fn new(library: CellLibrary) -> Self {
        Self { library }
    }

    /// Replace every selected cell, returning a new design
    ///
    /// The input design is left untouched. The output carries the namespace
    /// `techmap<N>`, where N is the input revision plus one, and each
    /// replacement cell is named `$techmap<N>` followed by the original name.
    pub fn rewrite(
        &self,
        design: &Design,
        selector: &Selector,
        template: &ReplacementTemplate,
        policy: MatchPolicy,
    ) -> Result<Rewritten> {
        check_idempotent(selector, template)?;

        let revision = design.revision + 1;
        let namespace = format!("techmap{}", revision);
        let mut report = RewriteReport {
            namespace: namespace.clone(),
            selector: selector.to_string(),
            template: template.name.clone(),
            replacements: Vec::new(),
        };

        let mut output = design.clone();
        output.revision = revision;
        output.namespace = Some(namespace.clone());

        for module in output.modules.values_mut() {
            if !module.cells.values().any(|cell| selector.matches(module, cell)) {
                continue;
            }

            let mut cells = IndexMap::with_capacity(module.cells.len());
            for (name, cell) in &module.cells {
                if !selector.matches(module, cell) {
                    cells.insert(name.clone(), cell.clone());
                    continue;
                }

                let (replacement, record) = self.replace(module, cell, template, &namespace)?;
                if cells.contains_key(&replacement.name)
                    || module.cells.contains_key(&replacement.name)
                {
                    return Err(RewriteError::NameCollision {
                        module: module.plain_name().to_string(),
                        name: replacement.name,
                    });
                }
                debug!(
                    "{}: {} ({}) -> {} ({})",
                    record.module, record.original, record.original_kind, record.name, record.kind
                );
                cells.insert(replacement.name.clone(), replacement);
                report.replacements.push(record);
            }
            module.cells = cells;
        }

        if report.is_empty() && policy == MatchPolicy::RequireAny {
            return Err(RewriteError::NoMatch {
                selector: selector.to_string(),
            });
        }

        info!(
            "Rewrote {} cell(s) matching {} with {} into namespace {}",
            report.len(),
            report.selector,
            template.kind,
            namespace
        );
        Ok(Rewritten {
            design: output,
            report,
        })
    }

    fn replace(
        &self,
        module: &Module,
        cell: &Cell,
        template: &ReplacementTemplate,
        namespace: &str,
    ) -> Result<(Cell, Replacement)> {
        let mut replacement = Cell::new(format!("${}{}", namespace, cell.name), template.kind.clone());
        replacement.attributes = cell.attributes.clone();

        let mut dropped_ports = Vec::new();
        for (port, signal) in &cell.connections {
            let target = template.port_name(port);
            if !template.keeps_port(target) {
                dropped_ports.push(unescape(port).to_string());
                continue;
            }
            let target = escape(target);
            if replacement.connections.contains_key(&target) {
                return Err(RewriteError::PortCollision {
                    cell: unescape(&cell.name).to_string(),
                    port: unescape(&target).to_string(),
                });
            }
            replacement.connections.insert(target, signal.clone());
        }

        let mut dropped_params = Vec::new();
        for (param, value) in &cell.parameters {
            match template.rule_for(param) {
                None => {
                    replacement.parameters.insert(param.clone(), value.clone());
                }
                Some(ParamRule::Rename { to, .. }) => {
                    replacement.parameters.insert(escape(to), value.clone());
                }
                Some(ParamRule::RenameInverted { to, .. }) => {
                    let inverted =
                        value
                            .inverted()
                            .ok_or_else(|| RewriteError::InvalidParameter {
                                cell: unescape(&cell.name).to_string(),
                                param: unescape(param).to_string(),
                                detail: format!("`{}` is not a single defined bit", value),
                            })?;
                    replacement.parameters.insert(escape(to), inverted);
                }
                Some(ParamRule::Drop { .. }) => dropped_params.push(unescape(param).to_string()),
            }
        }
        for (param, value) in &template.overrides {
            replacement.parameters.insert(escape(param), value.clone());
        }
        replacement.parameters.retain(|param, _| {
            let keep = template.keeps_param(param);
            if !keep {
                dropped_params.push(unescape(param).to_string());
            }
            keep
        });

        if !dropped_params.is_empty() {
            warn!(
                "Dropped parameter(s) {} of {} while mapping to {}",
                dropped_params.join(", "),
                unescape(&cell.name),
                template.kind
            );
        }

        self.library.check(&replacement)?;

        let record = Replacement {
            module: module.plain_name().to_string(),
            original: cell.name.clone(),
            original_kind: cell.kind.clone(),
            name: replacement.name.clone(),
            kind: replacement.kind.clone(),
            dropped_ports,
            dropped_params,
        };
        Ok((replacement, record))
    }
}

/// Rewrite against the builtin cell library
pub fn rewrite(
    design: &Design,
    selector: &Selector,
    template: &ReplacementTemplate,
    policy: MatchPolicy,
) -> Result<Rewritten> {
    Rewriter::default().rewrite(design, selector, template, policy)
}

/// Cells a selector picks, with their modules, in traversal order
pub fn select<'a>(design: &'a Design, selector: &Selector) -> Vec<(&'a Module, &'a Cell)> {
    design
        .cells()
        .filter(|(module, cell)| selector.matches(module, cell))
        .collect()
}

pub fn count_matches(design: &Design, selector: &Selector) -> usize {
    design
        .cells()
        .filter(|(module, cell)| selector.matches(module, cell))
        .count()
}

/// A selector can only be re-applied safely when its kind predicate excludes
/// the cells the template produces.
fn check_idempotent(selector: &Selector, template: &ReplacementTemplate) -> Result<()> {
    let not_idempotent = |reason: &str| RewriteError::NotIdempotent {
        selector: selector.to_string(),
        template: template.name.clone(),
        reason: reason.to_string(),
    };

    let mut kinds = selector.kinds().peekable();
    if kinds.peek().is_none() {
        return Err(not_idempotent("selector has no `t:` kind predicate"));
    }
    if kinds.any(|kind| kind == template.kind) {
        return Err(not_idempotent("template produces the selected kind"));
    }
    Ok(())
}
