//! hwproof netlist model
//!
//! This crate provides:
//! - The in-memory design model (modules, wires, cells, signal specs)
//! - Builtin primitive schemas
//! - An RTLIL reader and writer
//! - JSON dumps of the model

pub mod design;
pub mod error;
pub mod primitives;
pub mod rtlil;
pub mod sigspec;

pub use design::{Cell, Design, Module, Port, PortDirection, Wire};
pub use error::{NetlistError, Result};
pub use primitives::{CellLibrary, CellSchema, PrimitiveClass};
pub use rtlil::write_rtlil;
pub use sigspec::{Const, SigSpec};

use std::path::Path;
use tracing::debug;

/// Parse RTLIL source into a design named `design`
pub fn load(source: &str) -> Result<Design> {
    rtlil::parse("design", source)
}

/// Parse RTLIL source into a design with the given name
pub fn load_named(name: &str, source: &str) -> Result<Design> {
    rtlil::parse(name, source)
}

/// Parse a JSON dump produced by [`Design::to_json`]
pub fn load_json(source: &str) -> Result<Design> {
    serde_json::from_str(source)
        .map_err(|e| NetlistError::parse(e.line(), format!("invalid JSON design dump: {}", e)))
}

/// Load a design file, choosing the reader from the extension
///
/// `.json` files are read as model dumps, everything else as RTLIL.
pub fn load_path(path: impl AsRef<Path>) -> Result<Design> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| NetlistError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("design");

    debug!("Loading design {} from {}", name, path.display());
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_json(&source),
        _ => load_named(name, &source),
    }
}

/// Add the RTLIL `\` prefix to a public name; `$` and `\` names are kept
pub fn escape(name: &str) -> String {
    if name.starts_with('\\') || name.starts_with('$') {
        name.to_string()
    } else {
        format!("\\{}", name)
    }
}

/// Strip the RTLIL `\` prefix from a public name
pub fn unescape(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        assert_eq!(escape("clk"), "\\clk");
        assert_eq!(escape("\\clk"), "\\clk");
        assert_eq!(escape("$auto$1"), "$auto$1");
        assert_eq!(unescape("\\clk"), "clk");
        assert_eq!(unescape("$dlatch"), "$dlatch");
    }

    #[test]
    fn test_load_path_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut design = Design::new("dump");
        design.add_module(Module::new("top")).unwrap();
        let path = dir.path().join("dump.json");
        std::fs::write(&path, design.to_json().unwrap()).unwrap();

        let loaded = load_path(&path).unwrap();
        assert_eq!(loaded, design);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        match load_json("{\n  \"name\":\n}") {
            Err(NetlistError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.starts_with("invalid JSON design dump"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_path("/nonexistent/design.il").unwrap_err();
        assert!(matches!(err, NetlistError::Io { .. }));
    }
}
