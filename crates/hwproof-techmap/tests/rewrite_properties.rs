//! Property tests for the rewriter

use hwproof_netlist::{load_path, Cell, Const, Design, Module, SigSpec, Wire};
use hwproof_techmap::*;
use proptest::prelude::*;
use std::path::PathBuf;

const WIRES: &[&str] = &["clk", "le", "rst"];

#[derive(Debug, Clone)]
struct CellShape {
    kind: usize,
    enable: usize,
    polarity: bool,
    width: u32,
}

fn cell_shape() -> impl Strategy<Value = CellShape> {
    (0..4usize, 0..WIRES.len(), any::<bool>(), 1..=16u32).prop_map(
        |(kind, enable, polarity, width)| CellShape {
            kind,
            enable,
            polarity,
            width,
        },
    )
}

fn build_cell(index: usize, shape: &CellShape) -> Cell {
    let name = format!("$c{}", index);
    let enable = SigSpec::wire(WIRES[shape.enable]);
    let d = SigSpec::wire(format!("d{}", index));
    let q = SigSpec::wire(format!("q{}", index));
    let width = Const::Int(shape.width as i64);

    match shape.kind {
        0 | 1 => Cell::new(name, "$dlatch")
            .with_param("WIDTH", width)
            .with_param("EN_POLARITY", Const::bit(shape.polarity))
            .with_connection("EN", enable)
            .with_connection("D", d)
            .with_connection("Q", q),
        2 => Cell::new(name, "$dff")
            .with_param("WIDTH", width)
            .with_param("CLK_POLARITY", Const::bit(shape.polarity))
            .with_connection("CLK", enable)
            .with_connection("D", d)
            .with_connection("Q", q),
        _ => Cell::new(name, "$not")
            .with_param("A_SIGNED", Const::Int(0))
            .with_param("A_WIDTH", width.clone())
            .with_param("Y_WIDTH", width)
            .with_connection("A", d)
            .with_connection("Y", q),
    }
}

fn design_strategy() -> impl Strategy<Value = Design> {
    prop::collection::vec(prop::collection::vec(cell_shape(), 0..10), 1..4).prop_map(|modules| {
        let mut design = Design::new("generated");
        let mut index = 0;
        for (m, shapes) in modules.iter().enumerate() {
            let mut module = Module::new(if m == 0 { "top".to_string() } else { format!("m{}", m) });
            for wire in WIRES {
                module.add_wire(Wire::new(*wire, 1));
            }
            for shape in shapes {
                module.add_wire(Wire::new(format!("d{}", index), shape.width));
                module.add_wire(Wire::new(format!("q{}", index), shape.width));
                module.add_cell(build_cell(index, shape));
                index += 1;
            }
            design.add_module(module).unwrap();
        }
        design
    })
}

/// Latch selectors of the documented shape: a kind plus optional wire and
/// polarity predicates, scoped to `top` or to every module.
fn selector_strategy() -> impl Strategy<Value = Selector> {
    (
        any::<bool>(),
        prop::option::of(0..WIRES.len()),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(scoped, wire, polarity)| {
            let mut text = String::from(if scoped { "top/t:$dlatch" } else { "*/t:$dlatch" });
            if let Some(wire) = wire {
                text.push_str(&format!("/w:{}", WIRES[wire]));
            }
            if let Some(polarity) = polarity {
                text.push_str(&format!("/r:EN_POLARITY={}", polarity as u8));
            }
            Selector::parse(&text).unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The rewritten design never matches the selector that produced it
    #[test]
    fn rewrite_is_idempotent(design in design_strategy(), selector in selector_strategy()) {
        let template = ReplacementTemplate::builtin("dlatch2dff").unwrap();
        let out = rewrite(&design, &selector, &template, MatchPolicy::AllowNone).unwrap();

        prop_assert_eq!(count_matches(&out.design, &selector), 0);

        let again = rewrite(&out.design, &selector, &template, MatchPolicy::AllowNone).unwrap();
        prop_assert!(again.report.is_empty());
        prop_assert_eq!(&again.design.modules, &out.design.modules);
    }

    #[test]
    fn rewrite_is_deterministic(design in design_strategy(), selector in selector_strategy()) {
        let template = ReplacementTemplate::builtin("dlatch2dff").unwrap();
        let first = rewrite(&design, &selector, &template, MatchPolicy::AllowNone).unwrap();
        let second = rewrite(&design, &selector, &template, MatchPolicy::AllowNone).unwrap();

        prop_assert_eq!(first.design, second.design);
        prop_assert_eq!(first.report, second.report);
    }

    /// Every port of a replaced cell keeps its signal under the renamed port
    #[test]
    fn rewrite_preserves_connectivity(design in design_strategy(), selector in selector_strategy()) {
        let template = ReplacementTemplate::builtin("dlatch2dff").unwrap();
        let matched = count_matches(&design, &selector);
        let out = rewrite(&design, &selector, &template, MatchPolicy::AllowNone).unwrap();
        prop_assert_eq!(out.report.len(), matched);

        for replacement in &out.report.replacements {
            let before = &design.module(&replacement.module).unwrap().cells[&replacement.original];
            let after = &out.design.module(&replacement.module).unwrap().cells[&replacement.name];
            prop_assert!(replacement.dropped_ports.is_empty());
            for (port, signal) in &before.connections {
                prop_assert_eq!(after.connection(template.port_name(port)), Some(signal));
            }
        }

        // Untouched cells are carried over unchanged
        let untouched = design.cells().filter(|(m, c)| !selector.matches(m, c)).count();
        prop_assert_eq!(out.design.cells().count(), untouched + matched);
    }
}

#[test]
fn canonicalizes_transparent_latch() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../harness/TransparentLatch.il");
    let design = load_path(path).unwrap();
    let latch = design.top_module("top").unwrap().cells["$latch$internal_reg"].clone();

    let selector = Selector::parse("top/t:$dlatch/w:clk").unwrap();
    let template = ReplacementTemplate::builtin("dlatch2dff").unwrap();
    let out = rewrite(&design, &selector, &template, MatchPolicy::RequireAny).unwrap();

    assert_eq!(out.design.cell_count("$dlatch"), 0);
    assert_eq!(out.design.cell_count("$dff"), 1);

    let dff = &out.design.top_module("top").unwrap().cells["$techmap1$latch$internal_reg"];
    assert_eq!(dff.connection("CLK"), latch.connection("EN"));
    assert_eq!(dff.connection("D"), latch.connection("D"));
    assert_eq!(dff.connection("Q"), latch.connection("Q"));
    assert_eq!(dff.param("WIDTH"), Some(&Const::Int(16)));
    assert_eq!(dff.param("CLK_POLARITY"), Some(&Const::bit(false)));
    assert_eq!(dff.attributes, latch.attributes);

    // the wire `le` only reaches the latch through a module-level connect
    let by_alias = Selector::parse("top/t:$dlatch/w:le").unwrap();
    assert_eq!(count_matches(&design, &by_alias), 0);
}
