//! Property-based tests using QuickCheck

use calcmark_engine::{Engine, Error, Execution, Role, Statement};
use quickcheck::{QuickCheck, TestResult};

/// Units of pairwise different dimensions, with one same-dimension partner each.
const UNITS: &[(&str, &str)] = &[
    ("m", "km"),
    ("kg", "g"),
    ("s", "min"),
    ("N", "kN"),
    ("W", "kW"),
    ("Pa", "bar"),
    ("J", "kWh"),
    ("A", "mA"),
];

fn define(engine: &mut Engine, content: &str) -> Result<Execution, Error> {
    let statement = Statement::split(content).expect("statement");
    engine.execute(&statement, 1)
}

fn finite(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(-1e6, 1e6)
    } else {
        1.0
    }
}

/// Property: adding quantities of different dimensions is a mismatch
#[test]
fn prop_mismatched_dimensions_never_add() {
    fn prop(a: f64, b: f64, i: usize, j: usize, subtract: bool) -> TestResult {
        let (i, j) = (i % UNITS.len(), j % UNITS.len());
        if i == j {
            return TestResult::discard();
        }
        let engine = Engine::default();
        let op = if subtract { "-" } else { "+" };
        let expr = format!(
            "{} [{}] {} {} [{}]",
            finite(a),
            UNITS[i].0,
            op,
            finite(b),
            UNITS[j].0
        );
        TestResult::from_bool(matches!(
            engine.evaluate(&expr),
            Err(Error::DimensionMismatch { .. })
        ))
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(f64, f64, usize, usize, bool) -> TestResult);
}

/// Property: a compatible sum, expressed in the left unit, is the algebraic sum
#[test]
fn prop_compatible_sum_recovers_algebraic_sum() {
    fn prop(a: f64, b: f64, i: usize) -> bool {
        let (a, b) = (finite(a), finite(b));
        let (left, right) = UNITS[i % UNITS.len()];
        let engine = Engine::default();
        let sum = engine
            .evaluate(&format!("({}) [{}] + ({}) [{}]", a, left, b, right))
            .unwrap();
        let b_in_left = engine
            .convert(&engine.evaluate(&format!("({}) [{}]", b, right)).unwrap(), left)
            .unwrap()
            .magnitude;
        let expected = a + b_in_left;
        sum.unit_label() == left && (sum.magnitude - expected).abs() <= 1e-9 * expected.abs().max(1.0)
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(f64, f64, usize) -> bool);
}

/// Property: literal-only definitions are values, regardless of number formatting
#[test]
fn prop_literal_definitions_are_values() {
    fn prop(n: u32, decimal: bool, i: usize) -> bool {
        let literal = if decimal {
            format!("{}.5", n % 10_000)
        } else {
            (n % 10_000).to_string()
        };
        let unit = UNITS[i % UNITS.len()].1;
        let mut engine = Engine::default();
        match define(&mut engine, &format!("q_1 := {} [{}] * 2", literal, unit)) {
            Ok(Execution::Defined { id }) => id.role == Role::Value,
            _ => false,
        }
    }
    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(u32, bool, usize) -> bool);
}

/// Property: any reference to another symbol makes a formula
#[test]
fn prop_references_make_formulas() {
    fn prop(n: u32, decimal: bool) -> bool {
        let literal = if decimal {
            format!("{}.25", n % 10_000)
        } else {
            (n % 10_000).to_string()
        };
        let mut engine = Engine::default();
        if define(&mut engine, "k_0 := 3").is_err() {
            return false;
        }
        match define(&mut engine, &format!("r_1 := {} * k_0", literal)) {
            Ok(Execution::Defined { id }) => id.role == Role::Formula,
            _ => false,
        }
    }
    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(u32, bool) -> bool);
}

/// Property: reserved unit names are rejected and stay undefined afterwards
#[test]
fn prop_unit_names_are_reserved() {
    let names = ["V", "km", "kN", "mbar", "Pa", "Hz", "mol", "kWh", "µs", "MW"];
    for name in names {
        let mut engine = Engine::default();
        let defined = define(&mut engine, &format!("{} := 3", name));
        assert!(
            matches!(defined, Err(Error::ReservedNameCollision { .. })),
            "{name} should be reserved, got {defined:?}"
        );
        let later = define(&mut engine, &format!("y_1 := {} * 2 ==", name));
        assert!(
            matches!(later, Err(Error::UndefinedSymbol { .. })),
            "{name} should be undefined, got {later:?}"
        );
    }
}
