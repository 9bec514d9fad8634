//! Property-based tests for process/strip idempotence

use calcmark_document::{process, strip_computed, ProcessOptions};
use quickcheck::{QuickCheck, TestResult};

const NAMES: &[&str] = &["x", "y", "z_1", "L_{beam}", "w", "V"];
const UNITS: &[&str] = &["m", "kg", "s", "km/h", "N", "furlong"];

/// One line of a document. Covers every statement form, the failure
/// kinds that annotate, and the literal regions the scanner must skip.
fn line(template: u8, a: usize, b: usize, n: u16) -> String {
    let (p, q) = (NAMES[a % NAMES.len()], NAMES[b % NAMES.len()]);
    let unit = UNITS[(a % UNITS.len() + b % UNITS.len()) % UNITS.len()];
    match template % 16 {
        0 => format!("$${p} := {n}$$"),
        1 => format!("Let ${p} := {n} [{unit}]$ hold."),
        2 => format!("${p} := {q} * 2 ==$"),
        3 => format!("${p} + {q} ==$"),
        4 => format!("${p} := {q} / 0$"),
        5 => format!("Some prose with \\$ {n} and no math."),
        6 => format!("```\n${p} := {n} ==$\n```"),
        7 => format!("<!-- ${p} == $ --> `${q} ==$`"),
        8 => format!("$$\n{p} := {q} + 1 ==\n$$"),
        9 => format!("${p}^2 = {q}$"),
        10 => format!("${p} := {q} + ==$"),
        11 => format!("${p} == {n}$ <!-- [{unit}] -->"),
        12 => format!("${p} := {n} [{unit}] ==$ and ${q} := {p} ==$"),
        13 => format!("${p}(t) := t * {q}$ ${p}({n}) ==$"),
        14 => format!("$km === km$ ${p} =>$"),
        _ => format!("${p} := {q} \\quad \\color{{red}}{{\\text{{Error: stale}}}}$"),
    }
}

fn document(lines: &[(u8, usize, usize, u16)]) -> String {
    lines
        .iter()
        .map(|&(t, a, b, n)| line(t, a, b, n))
        .collect::<Vec<_>>()
        .join("\n")
}

fn run(doc: &str) -> String {
    process(doc, &ProcessOptions::default()).document
}

/// Property: stripping a processed document recovers the stripped original
#[test]
fn prop_strip_undoes_process() {
    fn prop(lines: Vec<(u8, usize, usize, u16)>) -> TestResult {
        if lines.is_empty() {
            return TestResult::discard();
        }
        let doc = document(&lines);
        TestResult::from_bool(strip_computed(&run(&doc)) == strip_computed(&doc))
    }
    QuickCheck::new()
        .tests(150)
        .quickcheck(prop as fn(Vec<(u8, usize, usize, u16)>) -> TestResult);
}

/// Property: processing the stripped output reproduces the output
#[test]
fn prop_process_of_stripped_is_stable() {
    fn prop(lines: Vec<(u8, usize, usize, u16)>) -> bool {
        let doc = document(&lines);
        let once = run(&doc);
        run(&strip_computed(&once)) == once
    }
    QuickCheck::new()
        .tests(150)
        .quickcheck(prop as fn(Vec<(u8, usize, usize, u16)>) -> bool);
}

/// Property: processing is idempotent
#[test]
fn prop_process_twice_is_process_once() {
    fn prop(lines: Vec<(u8, usize, usize, u16)>) -> bool {
        let once = run(&document(&lines));
        run(&once) == once
    }
    QuickCheck::new()
        .tests(150)
        .quickcheck(prop as fn(Vec<(u8, usize, usize, u16)>) -> bool);
}

/// Property: stripping is idempotent and leaves text outside regions alone
#[test]
fn prop_strip_is_idempotent() {
    fn prop(lines: Vec<(u8, usize, usize, u16)>) -> bool {
        let processed = run(&document(&lines));
        let stripped = strip_computed(&processed);
        strip_computed(&stripped) == stripped && stripped.lines().count() == processed.lines().count()
    }
    QuickCheck::new()
        .tests(150)
        .quickcheck(prop as fn(Vec<(u8, usize, usize, u16)>) -> bool);
}

#[test]
fn test_stale_outputs_and_annotations_are_replaced() {
    let doc = "$x := 2 [m]$\n$x * 3 == 99 [kg]$\n$V := 1 \\quad \\color{red}{\\text{Error: old}}$\n";
    let once = run(doc);
    assert!(once.contains("$x * 3 == 6 [m]$"));
    assert!(!once.contains("old"));
    assert_eq!(run(&once), once);
}
