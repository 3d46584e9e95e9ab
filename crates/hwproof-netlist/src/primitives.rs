//! Builtin primitive cell schemas
//!
//! Every `$` primitive used by the harness declares the ports it connects and
//! the parameters it carries. Cells of kinds outside the library (user module
//! instances) are not checked.

use crate::design::Cell;
use crate::error::{NetlistError, Result};
use crate::unescape;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Functional class of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveClass {
    /// Combinational logic
    Logic,
    /// Level-sensitive storage
    Latch,
    /// Edge-triggered storage
    FlipFlop,
    /// Formal-only cells (assertions, free inputs)
    Formal,
}

/// Port and parameter schema of one primitive kind
#[derive(Debug, Clone)]
pub struct CellSchema {
    pub kind: &'static str,
    pub class: PrimitiveClass,
    pub ports: &'static [&'static str],
    pub params: &'static [&'static str],
}

impl CellSchema {
    pub fn has_port(&self, port: &str) -> bool {
        self.ports.contains(&unescape(port))
    }

    pub fn has_param(&self, param: &str) -> bool {
        self.params.contains(&unescape(param))
    }
}

const UNARY_PARAMS: &[&str] = &["A_SIGNED", "A_WIDTH", "Y_WIDTH"];
const BINARY_PARAMS: &[&str] = &["A_SIGNED", "B_SIGNED", "A_WIDTH", "B_WIDTH", "Y_WIDTH"];

/// Schema registry keyed by cell kind
#[derive(Debug, Clone)]
pub struct CellLibrary {
    schemas: IndexMap<&'static str, CellSchema>,
}

impl Default for CellLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CellLibrary {
    /// The primitives a canonicalized verification netlist is built from
    pub fn builtin() -> Self {
        use PrimitiveClass::*;

        let mut library = Self {
            schemas: IndexMap::new(),
        };

        // Storage
        library.declare("$dlatch", Latch, &["EN", "D", "Q"], &["WIDTH", "EN_POLARITY"]);
        library.declare(
            "$adlatch",
            Latch,
            &["EN", "ARST", "D", "Q"],
            &["WIDTH", "EN_POLARITY", "ARST_POLARITY", "ARST_VALUE"],
        );
        library.declare("$dff", FlipFlop, &["CLK", "D", "Q"], &["WIDTH", "CLK_POLARITY"]);
        library.declare(
            "$adff",
            FlipFlop,
            &["CLK", "ARST", "D", "Q"],
            &["WIDTH", "CLK_POLARITY", "ARST_POLARITY", "ARST_VALUE"],
        );
        library.declare(
            "$dffe",
            FlipFlop,
            &["CLK", "EN", "D", "Q"],
            &["WIDTH", "CLK_POLARITY", "EN_POLARITY"],
        );

        // Logic
        for kind in ["$not", "$logic_not", "$reduce_or"] {
            library.declare(kind, Logic, &["A", "Y"], UNARY_PARAMS);
        }
        for kind in ["$and", "$or", "$xor", "$eq", "$ne", "$logic_and"] {
            library.declare(kind, Logic, &["A", "B", "Y"], BINARY_PARAMS);
        }
        library.declare("$mux", Logic, &["A", "B", "S", "Y"], &["WIDTH"]);

        // Formal
        for kind in ["$assert", "$assume", "$cover"] {
            library.declare(kind, Formal, &["A", "EN"], &[]);
        }
        library.declare("$anyseq", Formal, &["Y"], &["WIDTH"]);
        library.declare("$anyconst", Formal, &["Y"], &["WIDTH"]);
        library.declare("$initstate", Formal, &["Y"], &[]);

        library
    }

    fn declare(
        &mut self,
        kind: &'static str,
        class: PrimitiveClass,
        ports: &'static [&'static str],
        params: &'static [&'static str],
    ) {
        self.schemas.insert(
            kind,
            CellSchema {
                kind,
                class,
                ports,
                params,
            },
        );
    }

    pub fn get(&self, kind: &str) -> Option<&CellSchema> {
        self.schemas.get(kind)
    }

    pub fn is_latch(&self, kind: &str) -> bool {
        matches!(self.get(kind), Some(s) if s.class == PrimitiveClass::Latch)
    }

    /// Check a cell's parameters and connected ports against its schema
    pub fn check(&self, cell: &Cell) -> Result<()> {
        let Some(schema) = self.get(&cell.kind) else {
            return Ok(());
        };

        let mismatch = |detail: String| NetlistError::SchemaMismatch {
            cell: unescape(&cell.name).to_string(),
            kind: cell.kind.clone(),
            detail,
        };

        let declared: BTreeSet<&str> = schema.params.iter().copied().collect();
        let present: BTreeSet<&str> = cell.parameters.keys().map(|k| unescape(k)).collect();
        if let Some(extra) = present.difference(&declared).next() {
            return Err(mismatch(format!("unexpected parameter `{}`", extra)));
        }
        if let Some(missing) = declared.difference(&present).next() {
            return Err(mismatch(format!("missing parameter `{}`", missing)));
        }

        let declared: BTreeSet<&str> = schema.ports.iter().copied().collect();
        let present: BTreeSet<&str> = cell.connections.keys().map(|k| unescape(k)).collect();
        if let Some(extra) = present.difference(&declared).next() {
            return Err(mismatch(format!("unexpected port `{}`", extra)));
        }
        if let Some(missing) = declared.difference(&present).next() {
            return Err(mismatch(format!("unconnected port `{}`", missing)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigspec::{Const, SigSpec};

    fn dff() -> Cell {
        Cell::new("$ff", "$dff")
            .with_param("WIDTH", Const::Int(1))
            .with_param("CLK_POLARITY", Const::Int(1))
            .with_connection("CLK", SigSpec::wire("clk"))
            .with_connection("D", SigSpec::wire("d"))
            .with_connection("Q", SigSpec::wire("q"))
    }

    #[test]
    fn test_valid_cell_passes() {
        assert!(CellLibrary::builtin().check(&dff()).is_ok());
    }

    #[test]
    fn test_extra_parameter_rejected() {
        let cell = dff().with_param("EN_POLARITY", Const::Int(1));
        let err = CellLibrary::builtin().check(&cell).unwrap_err();
        assert!(err.to_string().contains("EN_POLARITY"));
    }

    #[test]
    fn test_missing_port_rejected() {
        let mut cell = dff();
        cell.connections.shift_remove("\\CLK");
        let err = CellLibrary::builtin().check(&cell).unwrap_err();
        assert!(err.to_string().contains("unconnected port `CLK`"));
    }

    #[test]
    fn test_unknown_kind_unchecked() {
        let cell = Cell::new("\\u0", "\\submodule").with_param("ANYTHING", Const::Int(3));
        assert!(CellLibrary::builtin().check(&cell).is_ok());
    }

    #[test]
    fn test_storage_classes() {
        let library = CellLibrary::builtin();
        assert!(library.is_latch("$dlatch"));
        assert!(library.is_latch("$adlatch"));
        assert_eq!(library.get("$dff").map(|s| s.class), Some(PrimitiveClass::FlipFlop));
        assert!(!library.is_latch("$dff"));
    }
}
