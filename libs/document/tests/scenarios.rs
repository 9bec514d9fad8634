//! Whole-document passes over small worked examples

use calcmark_document::{process, strip_computed, ProcessOptions, Processed, Processor};
use calcmark_engine::{Role, SummaryBackend};
use std::sync::Arc;

fn run(doc: &str) -> Processed {
    process(doc, &ProcessOptions::default())
}

#[test]
fn test_force_from_mass_and_acceleration() {
    let doc = "Mass $m := 5 [kg]$, acceleration $a := 9.81 [m/s^2]$.\n\nForce: $F := m*a ==$\n";
    let out = run(doc);
    assert_eq!(
        out.document,
        "Mass $m := 5 [kg]$, acceleration $a := 9.81 [m/s^2]$.\n\nForce: $F := m*a == 49.05 [N]$\n"
    );
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_dimensionless_result_has_no_unit() {
    let out = run("$x := 5$ then $y := x + 1 ==$");
    assert_eq!(out.document, "$x := 5$ then $y := x + 1 == 6$");
}

#[test]
fn test_reserved_name_is_annotated_and_downstream_fails() {
    let doc = "$V := 37824$\n$Cap := V*15*0.001$\n";
    let out = run(doc);
    let lines: Vec<&str> = out.document.lines().collect();
    assert!(lines[0].starts_with("$V := 37824 \\quad \\color{red}{\\text{Error: ReservedNameCollision"));
    assert!(lines[1].starts_with("$Cap := V*15*0.001 \\quad \\color{red}{\\text{Error: UndefinedSymbol"));

    let kinds: Vec<_> = out.diagnostics.iter().map(|d| (d.line, d.kind)).collect();
    assert_eq!(
        kinds,
        vec![(1, "ReservedNameCollision"), (2, "UndefinedSymbol")]
    );
}

#[test]
fn test_dimension_mismatch_goes_into_output_slot() {
    let doc = "$a := 3 [m]$ $b := 2 [kg]$ $c := a + b ==$";
    let out = run(doc);
    assert!(out
        .document
        .ends_with("$c := a + b == \\color{red}{\\text{DimensionMismatch: incompatible units (m) and (kg)}}$"));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, "DimensionMismatch");
}

#[test]
fn test_processing_twice_changes_nothing() {
    let doc = "$m := 5 [kg]$\n$a := 9.81 [m/s^2]$\n$F := m*a ==$\n$V := 1$\n";
    let once = run(doc).document;
    let twice = run(&once).document;
    assert_eq!(once, twice);
    assert_eq!(strip_computed(&once), doc);
}

#[test]
fn test_results_are_replaced_not_appended() {
    let stale = "$x := 2$ $x * 3 == 5$";
    assert_eq!(run(stale).document, "$x := 2$ $x * 3 == 6$");
}

#[test]
fn test_display_unit_comment_converts_result() {
    let doc = "$v := 36 [km/h] ==$ <!-- [m/s] -->";
    assert_eq!(run(doc).document, "$v := 36 [km/h] == 10 [m/s]$ <!-- [m/s] -->");
}

#[test]
fn test_custom_unit_in_document() {
    let doc = "$EUR === EUR$\n$price := 0.30 [EUR/kWh]$\n$E_{use} := 1200 [kWh]$\n$cost := price * E_{use} ==$ <!-- [EUR] -->\n";
    let out = run(doc);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert!(out.document.contains("$cost := price * E_{use} == 360 [EUR]$"));
    assert_eq!(out.ir.units.len(), 1);
    assert_eq!(out.ir.units[0].name, "EUR");
}

#[test]
fn test_code_and_comments_are_untouched() {
    let doc = "```\n$x := 1 ==$\n```\n`$y ==$` <!-- $z == $ --> \\$5 and $w := 2 ==$";
    let out = run(doc);
    assert_eq!(
        out.document,
        "```\n$x := 1 ==$\n```\n`$y ==$` <!-- $z == $ --> \\$5 and $w := 2 == 2$"
    );
}

#[test]
fn test_block_regions_keep_their_layout() {
    let doc = "$$\nr := 2 [m]\n$$\n\n$$\n\\pi r^2 ==\n$$\n";
    let out = run(doc);
    assert_eq!(out.document, "$$\nr := 2 [m]\n$$\n\n$$\n\\pi r^2 == 12.5664 [m^2]\n$$\n");
}

#[test]
fn test_diagnostic_position_points_into_region() {
    let doc = "$a := 5 [m]$\nSee $q := 2 @ 3$";
    let out = run(doc);
    assert_eq!(out.diagnostics.len(), 1);
    let d = &out.diagnostics[0];
    assert_eq!((d.line, d.column, d.kind), (2, 13, "TokenizeError"));
}

#[test]
fn test_evaluation_errors_point_at_the_culprit() {
    let doc = "$V := 37824$\n$Cap := V*15*0.001 ==$\n$a := 3 [m]$ $b := a + 2 [kg] ==$\n";
    let out = run(doc);
    let positions: Vec<_> = out
        .diagnostics
        .iter()
        .map(|d| (d.line, d.column, d.kind))
        .collect();
    assert_eq!(
        positions,
        vec![
            (1, 2, "ReservedNameCollision"),
            (2, 9, "UndefinedSymbol"),
            (3, 22, "DimensionMismatch"),
        ]
    );
}

#[test]
fn test_ir_describes_every_symbol() {
    let doc = "$m := 5 [kg]$ $a := 9.81 [m/s^2]$ $F := m*a ==$ $f(x) := 2 x$";
    let ir = run(doc).ir;
    let json: serde_json::Value = serde_json::from_str(&ir.to_json().unwrap()).unwrap();

    assert_eq!(json["version"], 1);
    let symbols = json["symbols"].as_array().unwrap();
    let ids: Vec<_> = symbols
        .iter()
        .map(|s| s["internal_id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["value-1", "value-2", "formula-1", "param-1", "formula-2"]
    );

    let force = ir.symbol("F").unwrap();
    assert_eq!(force.role, Role::Formula);
    assert!(force.conversion_ok);
    let deps: Vec<String> = force
        .depends_on
        .iter()
        .flatten()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(deps, vec!["value-1", "value-2"]);

    let mass = &symbols[0];
    assert_eq!(mass["display_name"], "m");
    assert_eq!(mass["original"]["magnitude"], 5.0);
    assert_eq!(mass["original"]["unit"], "kg");
}

#[test]
fn test_failed_values_are_kept_in_ir() {
    let out = run("$d := 3 [furlong]$");
    assert_eq!(out.diagnostics[0].kind, "UnknownUnit");
    let d = out.ir.symbol("d").unwrap();
    assert!(!d.conversion_ok);
}

#[test]
fn test_timeout_can_be_disabled() {
    let options = ProcessOptions {
        timeout_ms: 0,
        ..ProcessOptions::default()
    };
    let out = process("$2^{10} ==$", &options);
    assert_eq!(out.document, "$2^{10} == 1024$");
}

#[test]
fn test_precision_option() {
    let options = ProcessOptions {
        precision: 3,
        ..ProcessOptions::default()
    };
    let out = process("$2/3 ==$", &options);
    assert_eq!(out.document, "$2/3 == 0.667$");
}

#[test]
fn test_symbolic_regions_use_backend_when_present() {
    let plain = run("$x + 1 =>$");
    assert_eq!(plain.document, "$x + 1 =>$");

    let processor =
        Processor::new(ProcessOptions::default()).with_symbolic_backend(Arc::new(SummaryBackend));
    let once = processor.process("$x + 1 =>$").document;
    assert_eq!(once, "$x + 1 => \\text{x + 1}$");
    assert_eq!(processor.process(&once).document, once);
    assert_eq!(strip_computed(&once), "$x + 1 =>$");
}
