//! Minimal result renderer
//!
//! Output stays re-parseable: units go in bracket form (`49.05 [N]`).

use calcmark_engine::{sanitize, Error, Quantity};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

const SCIENTIFIC_ABOVE: f64 = 1e6;
const SCIENTIFIC_BELOW: f64 = 1e-4;
/// `Decimal` holds at most 28 significant digits.
const MAX_PRECISION: u32 = 28;

fn round_significant(value: f64, precision: u32) -> Option<Decimal> {
    let digits = precision.clamp(1, MAX_PRECISION);
    Decimal::from_f64(value)?
        .round_sf_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
        .map(|d| d.normalize())
}

/// Rounds to `precision` significant digits and drops trailing zeros;
/// very large or small magnitudes use `m \cdot 10^{e}`.
pub fn format_magnitude(value: f64, precision: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    if (SCIENTIFIC_BELOW..SCIENTIFIC_ABOVE).contains(&abs) {
        return match round_significant(value, precision) {
            Some(d) if d.is_zero() => "0".to_string(),
            Some(d) => d.to_string(),
            None => value.to_string(),
        };
    }

    let mut exponent = abs.log10().floor() as i32;
    let mut mantissa = round_significant(value / 10f64.powi(exponent), precision);
    // Rounding can carry into the next power of ten (9.9999995 -> 10).
    if let Some(m) = mantissa {
        if m.abs() >= Decimal::TEN {
            exponent += 1;
            mantissa = m
                .to_f64()
                .and_then(|f| round_significant(f / 10.0, precision));
        }
    }
    match mantissa {
        Some(m) => format!("{} \\cdot 10^{{{}}}", m, exponent),
        None => format!("{:e}", value),
    }
}

/// `49.05 [N]`, or the bare number for quantities without a unit.
pub fn render_quantity(quantity: &Quantity, precision: u32) -> String {
    let number = format_magnitude(quantity.magnitude, precision);
    match &quantity.unit {
        Some(unit) if !unit.factors().is_empty() => format!("{} [{}]", number, unit),
        _ => number,
    }
}

/// Marker written into an output slot for a failed evaluation.
pub fn render_error(err: &Error) -> String {
    format!(
        "\\color{{red}}{{\\text{{{}: {}}}}}",
        err.kind(),
        sanitize(&err.to_string())
    )
}
