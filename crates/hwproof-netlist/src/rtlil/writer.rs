//! RTLIL writer

use crate::design::{Cell, Design, Module, Wire};
use crate::sigspec::Const;
use indexmap::IndexMap;
use std::fmt::Write;

/// Render a design as RTLIL text accepted by [`crate::load`]
pub fn write_rtlil(design: &Design) -> String {
    let mut out = String::new();
    if let Some(autoidx) = design.autoidx {
        let _ = writeln!(out, "autoidx {}", autoidx);
    }
    for module in design.modules.values() {
        write_module(&mut out, module, design.top.as_deref() == Some(module.name.as_str()));
    }
    out
}

fn write_attributes(out: &mut String, indent: &str, attributes: &IndexMap<String, Const>) {
    for (key, value) in attributes {
        let _ = writeln!(out, "{}attribute {} {}", indent, key, value);
    }
}

fn write_module(out: &mut String, module: &Module, is_top: bool) {
    let mut attributes = module.attributes.clone();
    if is_top && !attributes.contains_key("\\top") {
        attributes.insert("\\top".to_string(), Const::Int(1));
    }
    write_attributes(out, "", &attributes);
    let _ = writeln!(out, "module {}", module.name);

    for (key, value) in &module.parameters {
        match value {
            Some(value) => {
                let _ = writeln!(out, "  parameter {} {}", key, value);
            }
            None => {
                let _ = writeln!(out, "  parameter {}", key);
            }
        }
    }
    for wire in module.wires.values() {
        write_wire(out, wire);
    }
    for cell in module.cells.values() {
        write_cell(out, cell);
    }
    for (lhs, rhs) in &module.connections {
        let _ = writeln!(out, "  connect {} {}", lhs, rhs);
    }
    let _ = writeln!(out, "end");
}

fn write_wire(out: &mut String, wire: &Wire) {
    write_attributes(out, "  ", &wire.attributes);
    let mut line = String::from("  wire");
    if wire.width != 1 {
        let _ = write!(line, " width {}", wire.width);
    }
    if wire.offset != 0 {
        let _ = write!(line, " offset {}", wire.offset);
    }
    if wire.upto {
        line.push_str(" upto");
    }
    if wire.signed {
        line.push_str(" signed");
    }
    if let Some(port) = wire.port {
        let _ = write!(line, " {} {}", port.direction.keyword(), port.id);
    }
    let _ = writeln!(out, "{} {}", line, wire.name);
}

fn write_cell(out: &mut String, cell: &Cell) {
    write_attributes(out, "  ", &cell.attributes);
    let _ = writeln!(out, "  cell {} {}", cell.kind, cell.name);
    for (key, value) in &cell.parameters {
        let _ = writeln!(out, "    parameter {} {}", key, value);
    }
    for (port, signal) in &cell.connections {
        let _ = writeln!(out, "    connect {} {}", port, signal);
    }
    let _ = writeln!(out, "  end");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::PortDirection;
    use crate::sigspec::SigSpec;

    fn sample() -> Design {
        let mut module = Module::new("top");
        module.add_wire(Wire::new("clk", 1).with_port(1, PortDirection::Input));
        module.add_wire(Wire::new("d", 8).with_port(2, PortDirection::Input));
        module.add_wire(Wire::new("q", 8).with_port(3, PortDirection::Output));
        module.add_cell(
            Cell::new("$ff", "$dff")
                .with_param("WIDTH", Const::Int(8))
                .with_param("CLK_POLARITY", Const::bit(false))
                .with_connection("CLK", SigSpec::wire("clk"))
                .with_connection("D", SigSpec::wire("d"))
                .with_connection("Q", SigSpec::wire("q")),
        );
        module.connections.push((
            SigSpec::Slice {
                wire: "\\q".into(),
                msb: 0,
                lsb: 0,
            },
            SigSpec::Const(Const::Bits("1".into())),
        ));

        let mut design = Design::new("sample");
        design.add_module(module).unwrap();
        design.select_top("top").unwrap();
        design
    }

    #[test]
    fn test_written_rtlil_reparses() {
        let design = sample();
        let text = write_rtlil(&design);
        let reparsed = crate::load_named("sample", &text).unwrap();

        let original = design.top_module("top").unwrap();
        let module = reparsed.top_module("top").unwrap();
        assert_eq!(module.wires, original.wires);
        assert_eq!(module.cells, original.cells);
        assert_eq!(module.connections, original.connections);
        assert_eq!(reparsed.top, design.top);
    }

    #[test]
    fn test_top_attribute_emitted() {
        let text = write_rtlil(&sample());
        assert!(text.starts_with("attribute \\top 1\nmodule \\top\n"));
        assert!(text.contains("    parameter \\CLK_POLARITY 1'0\n"));
        assert!(text.contains("  wire width 8 input 2 \\d\n"));
    }
}
