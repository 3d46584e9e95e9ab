//! Design preparation: read, canonicalize, select top

use crate::error::{HarnessError, Result};
use hwproof_config::{DesignFormat, HarnessConfig, ScriptStep};
use hwproof_netlist::{load_json, load_named, CellLibrary, Design, NetlistError};
use hwproof_techmap::{MatchPolicy, RewriteReport, Rewriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Design ready for verification, with the rewrites applied to it
#[derive(Debug, Clone)]
pub struct PreparedDesign {
    pub design: Design,
    pub rewrites: Vec<RewriteReport>,
}

impl PreparedDesign {
    /// Latch cells the rewrites left in place
    pub fn latch_count(&self) -> usize {
        let library = CellLibrary::builtin();
        self.design
            .modules
            .values()
            .flat_map(|module| module.cells.values())
            .filter(|cell| library.is_latch(&cell.kind))
            .count()
    }
}

/// Run the preprocessing script of `config`
///
/// Relative paths are resolved against `base_dir`. Every structural problem
/// is reported here, before any engine starts.
pub fn prepare(config: &HarnessConfig, base_dir: &Path) -> Result<PreparedDesign> {
    let library = CellLibrary::builtin();
    let rewriter = Rewriter::new(library.clone());
    let mut design: Option<Design> = None;
    let mut rewrites = Vec::new();

    for step in &config.script {
        match step {
            ScriptStep::Read { format, file } => {
                let path = resolve_file(config, base_dir, file)?;
                let loaded = read_design(*format, &path)?;
                loaded.validate(&library)?;
                info!(
                    "Read {} ({} modules) from {}",
                    loaded.name,
                    loaded.modules.len(),
                    path.display()
                );
                match design.as_mut() {
                    Some(current) => current.merge(loaded)?,
                    None => design = Some(loaded),
                }
            }
            ScriptStep::Canonicalize { selector, template } => {
                let current = design
                    .take()
                    .ok_or_else(|| HarnessError::NoDesign(step.to_string()))?;
                let template = config.template(template)?;
                let rewritten =
                    rewriter.rewrite(&current, selector, &template, MatchPolicy::RequireAny)?;
                rewrites.push(rewritten.report);
                design = Some(rewritten.design);
            }
            ScriptStep::SelectTop(name) => {
                let current = design
                    .as_mut()
                    .ok_or_else(|| HarnessError::NoDesign(step.to_string()))?;
                current.select_top(name)?;
                debug!("Selected top module {}", name);
            }
        }
    }

    let design = design.ok_or_else(|| HarnessError::NoDesign("verification".to_string()))?;
    if design.top().is_none() {
        return Err(HarnessError::NoTop);
    }
    let prepared = PreparedDesign { design, rewrites };
    let latches = prepared.latch_count();
    if latches > 0 {
        warn!("{} latch cells remain after canonicalization", latches);
    }
    Ok(prepared)
}

/// Match a script file against `[files]` by path or by file name
fn resolve_file(config: &HarnessConfig, base_dir: &Path, file: &str) -> Result<PathBuf> {
    let wanted = Path::new(file);
    let listed = config
        .files
        .iter()
        .find(|listed| {
            listed.as_path() == wanted
                || (wanted.components().count() == 1 && listed.file_name() == wanted.file_name())
        })
        .ok_or_else(|| HarnessError::UnlistedFile(file.to_string()))?;

    if listed.is_absolute() {
        Ok(listed.clone())
    } else {
        Ok(base_dir.join(listed))
    }
}

fn read_design(format: DesignFormat, path: &Path) -> Result<Design> {
    let source = std::fs::read_to_string(path).map_err(|e| NetlistError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("design");

    let design = match format {
        DesignFormat::Rtlil => load_named(name, &source)?,
        DesignFormat::Json => load_json(&source)?,
    };
    Ok(design)
}
