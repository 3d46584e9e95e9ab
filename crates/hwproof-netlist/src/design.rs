//! Netlist representation: designs, modules, wires and cells

use crate::error::{NetlistError, Result};
use crate::primitives::CellLibrary;
use crate::sigspec::{Const, SigSpec};
use crate::{escape, unescape};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A hardware design: an ordered set of modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    /// Design identifier
    pub name: String,
    /// Namespace assigned by the last canonicalization rewrite
    #[serde(default)]
    pub namespace: Option<String>,
    /// Number of rewrites applied since load
    #[serde(default)]
    pub revision: u32,
    /// Modules in declaration order
    pub modules: IndexMap<String, Module>,
    /// Selected top module
    #[serde(default)]
    pub top: Option<String>,
    /// Auto-index counter carried through from the source
    #[serde(default)]
    pub autoidx: Option<u64>,
}

/// Hardware module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Module name
    pub name: String,
    #[serde(default)]
    pub attributes: IndexMap<String, Const>,
    /// Module parameters with their default values
    #[serde(default)]
    pub parameters: IndexMap<String, Option<Const>>,
    /// Wires in declaration order; port wires carry a [`Port`]
    #[serde(default)]
    pub wires: IndexMap<String, Wire>,
    /// Cells in declaration order
    #[serde(default)]
    pub cells: IndexMap<String, Cell>,
    /// Module-level `connect lhs rhs` statements
    #[serde(default)]
    pub connections: Vec<(SigSpec, SigSpec)>,
}

/// Wire declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub name: String,
    pub width: u32,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub upto: bool,
    #[serde(default)]
    pub signed: bool,
    /// Present when the wire is a module port
    #[serde(default)]
    pub port: Option<Port>,
    #[serde(default)]
    pub attributes: IndexMap<String, Const>,
}

/// Port information of a wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// 1-based port position
    pub id: u32,
    pub direction: PortDirection,
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

impl PortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
            PortDirection::Inout => "inout",
        }
    }
}

/// Cell instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Instance name, unique within its module
    pub name: String,
    /// Cell kind: a `$` primitive or a module name
    pub kind: String,
    #[serde(default)]
    pub parameters: IndexMap<String, Const>,
    /// Port name to connected signal
    #[serde(default)]
    pub connections: IndexMap<String, SigSpec>,
    #[serde(default)]
    pub attributes: IndexMap<String, Const>,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            revision: 0,
            modules: IndexMap::new(),
            top: None,
            autoidx: None,
        }
    }

    /// Add a module, rejecting duplicate names
    pub fn add_module(&mut self, module: Module) -> Result<()> {
        if self.modules.contains_key(&module.name) {
            return Err(NetlistError::DuplicateModule(
                unescape(&module.name).to_string(),
            ));
        }
        if self.top.is_none() && module.attributes.keys().any(|k| unescape(k) == "top") {
            self.top = Some(module.name.clone());
        }
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Merge all modules of another design into this one
    pub fn merge(&mut self, other: Design) -> Result<()> {
        for (_, module) in other.modules {
            self.add_module(module)?;
        }
        if self.top.is_none() {
            self.top = other.top;
        }
        self.autoidx = match (self.autoidx, other.autoidx) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(())
    }

    /// Look up a module; the name may omit the leading `\`
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules
            .get(name)
            .or_else(|| self.modules.get(&escape(name)))
    }

    /// Module lookup that fails with [`NetlistError::NotFound`]
    pub fn top_module(&self, name: &str) -> Result<&Module> {
        self.module(name)
            .ok_or_else(|| NetlistError::NotFound(unescape(name).to_string()))
    }

    /// Mark a module as the verification top
    pub fn select_top(&mut self, name: &str) -> Result<()> {
        let resolved = self.top_module(name)?.name.clone();
        self.top = Some(resolved);
        Ok(())
    }

    /// The selected top module
    pub fn top(&self) -> Option<&Module> {
        self.top.as_deref().and_then(|name| self.module(name))
    }

    /// All cells with their owning module, in declaration order
    pub fn cells(&self) -> impl Iterator<Item = (&Module, &Cell)> {
        self.modules
            .values()
            .flat_map(|module| module.cells.values().map(move |cell| (module, cell)))
    }

    /// Number of cells of the given kind across all modules
    pub fn cell_count(&self, kind: &str) -> usize {
        self.cells().filter(|(_, cell)| cell.kind == kind).count()
    }

    /// Check every primitive cell against its schema
    pub fn validate(&self, library: &CellLibrary) -> Result<()> {
        for (_, cell) in self.cells() {
            library.check(cell)?;
        }
        Ok(())
    }

    /// Serialize the in-memory model as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| NetlistError::Serialize(e.to_string()))
    }
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: escape(&name.into()),
            attributes: IndexMap::new(),
            parameters: IndexMap::new(),
            wires: IndexMap::new(),
            cells: IndexMap::new(),
            connections: Vec::new(),
        }
    }

    /// Module name without the RTLIL `\` prefix
    pub fn plain_name(&self) -> &str {
        unescape(&self.name)
    }

    /// Port wires ordered by port id
    pub fn ports(&self) -> Vec<&Wire> {
        let mut ports: Vec<&Wire> = self.wires.values().filter(|w| w.port.is_some()).collect();
        ports.sort_by_key(|w| w.port.map(|p| p.id));
        ports
    }

    pub fn add_wire(&mut self, wire: Wire) {
        self.wires.insert(wire.name.clone(), wire);
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.insert(cell.name.clone(), cell);
    }

    /// Cells of the given kind in declaration order
    pub fn cells_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.values().filter(move |cell| cell.kind == kind)
    }
}

impl Wire {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: escape(&name.into()),
            width,
            offset: 0,
            upto: false,
            signed: false,
            port: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_port(mut self, id: u32, direction: PortDirection) -> Self {
        self.port = Some(Port { id, direction });
        self
    }
}

impl Cell {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            parameters: IndexMap::new(),
            connections: IndexMap::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: Const) -> Self {
        self.parameters.insert(escape(name), value);
        self
    }

    pub fn with_connection(mut self, port: &str, signal: SigSpec) -> Self {
        self.connections.insert(escape(port), signal);
        self
    }

    /// Parameter lookup; the name may omit the leading `\`
    pub fn param(&self, name: &str) -> Option<&Const> {
        self.parameters
            .get(name)
            .or_else(|| self.parameters.get(&escape(name)))
    }

    /// Connection lookup; the port name may omit the leading `\`
    pub fn connection(&self, port: &str) -> Option<&SigSpec> {
        self.connections
            .get(port)
            .or_else(|| self.connections.get(&escape(port)))
    }
}
