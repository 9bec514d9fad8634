use crate::dimension::{BaseDimension, DimensionVector, SI_BASE_DIMENSIONS};
use crate::error::{Error, Result};
use num_rational::Rational32;
use num_traits::{CheckedAdd, CheckedMul, One, Signed, Zero};
use std::fmt;

/// One named factor of a unit product, e.g. `s^-2` in `m/s^2`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitFactor {
    pub symbol: String,
    pub exponent: Rational32,
}

/// A resolved unit: a dimension vector plus the scalar that converts one of
/// this unit into the coherent base units of that vector.
///
/// `factors` only records how the unit was written so it can be displayed
/// the way the author wrote it; all arithmetic goes through `dims`/`scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitExpr {
    factors: Vec<UnitFactor>,
    dims: DimensionVector,
    scale: f64,
}

impl UnitExpr {
    pub fn atom(symbol: impl Into<String>, dims: DimensionVector, scale: f64) -> Self {
        Self {
            factors: vec![UnitFactor {
                symbol: symbol.into(),
                exponent: Rational32::one(),
            }],
            dims,
            scale,
        }
    }

    /// The empty product: dimensionless with scale 1.
    pub fn one() -> Self {
        Self {
            factors: Vec::new(),
            dims: DimensionVector::dimensionless(),
            scale: 1.0,
        }
    }

    /// A placeholder for a unit the registry could not resolve. It carries the
    /// authored text for display and behaves as a dimensionless unit of scale 1.
    pub fn opaque(text: impl Into<String>) -> Self {
        Self::atom(text, DimensionVector::dimensionless(), 1.0)
    }

    pub fn factors(&self) -> &[UnitFactor] {
        &self.factors
    }

    pub fn dims(&self) -> &DimensionVector {
        &self.dims
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_dimensionless()
    }

    /// `Some(symbol)` when the unit is exactly one factor with exponent 1.
    pub fn single_symbol(&self) -> Option<&str> {
        match self.factors.as_slice() {
            [f] if f.exponent.is_one() => Some(f.symbol.as_str()),
            _ => None,
        }
    }

    /// Same dimension and scale, displayed under a new name.
    pub fn renamed(&self, symbol: impl Into<String>) -> Self {
        Self::atom(symbol, self.dims.clone(), self.scale)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            factors: self.factors.clone(),
            dims: self.dims.clone(),
            scale: self.scale * factor,
        }
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        let mut factors = self.factors.clone();
        for f in &other.factors {
            match factors.iter_mut().find(|g| g.symbol == f.symbol) {
                Some(g) => {
                    g.exponent = g
                        .exponent
                        .checked_add(&f.exponent)
                        .ok_or_else(|| exponent_overflow(&f.symbol))?;
                }
                None => factors.push(f.clone()),
            }
        }
        factors.retain(|f| !f.exponent.is_zero());
        let dims = self
            .dims
            .mul(&other.dims)
            .ok_or_else(|| exponent_overflow(&self.to_string()))?;
        Ok(Self {
            factors,
            dims,
            scale: self.scale * other.scale,
        })
    }

    pub fn div(&self, other: &Self) -> Result<Self> {
        self.mul(&other.pow(Rational32::from_integer(-1))?)
    }

    /// Raises every factor to `exponent`. Fails when a resulting exponent
    /// leaves the `i32` range.
    pub fn pow(&self, exponent: Rational32) -> Result<Self> {
        let e = *exponent.numer() as f64 / *exponent.denom() as f64;
        let mut factors = self
            .factors
            .iter()
            .map(|f| {
                let exponent = f
                    .exponent
                    .checked_mul(&exponent)
                    .ok_or_else(|| exponent_overflow(&f.symbol))?;
                Ok(UnitFactor {
                    symbol: f.symbol.clone(),
                    exponent,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        factors.retain(|f| !f.exponent.is_zero());
        let dims = self
            .dims
            .pow(exponent)
            .ok_or_else(|| exponent_overflow(&self.to_string()))?;
        Ok(Self {
            factors,
            dims,
            scale: self.scale.powf(e),
        })
    }

    /// Coherent base-unit form: same dimensions, scale 1, one factor per
    /// non-zero base slot. `custom_names` names the slots after the SI ones.
    pub fn base_form(&self, custom_names: &[String]) -> Self {
        let factors = self
            .dims
            .iter()
            .map(|(slot, exponent)| UnitFactor {
                symbol: slot_symbol(slot, custom_names),
                exponent,
            })
            .collect();
        Self {
            factors,
            dims: self.dims.clone(),
            scale: 1.0,
        }
    }
}

fn exponent_overflow(unit: &str) -> Error {
    Error::ExponentOverflow {
        unit: unit.to_string(),
    }
}

fn slot_symbol(slot: usize, custom_names: &[String]) -> String {
    if slot < SI_BASE_DIMENSIONS {
        BaseDimension::ALL[slot].symbol().to_string()
    } else {
        custom_names
            .get(slot - SI_BASE_DIMENSIONS)
            .cloned()
            .unwrap_or_else(|| format!("dim{}", slot))
    }
}

fn write_factor(out: &mut String, symbol: &str, exponent: Rational32) {
    out.push_str(symbol);
    if exponent.is_one() {
        return;
    }
    if exponent.is_integer() {
        out.push('^');
        out.push_str(&exponent.to_integer().to_string());
    } else {
        out.push_str(&format!("^({}/{})", exponent.numer(), exponent.denom()));
    }
}

impl fmt::Display for UnitExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numerator = String::new();
        let mut denominator = Vec::new();
        for factor in &self.factors {
            if factor.exponent.is_negative() {
                denominator.push(factor);
                continue;
            }
            if !numerator.is_empty() {
                numerator.push('*');
            }
            write_factor(&mut numerator, &factor.symbol, factor.exponent);
        }
        if numerator.is_empty() {
            numerator.push('1');
        }
        if denominator.is_empty() {
            return f.write_str(&numerator);
        }
        let mut rendered = Vec::with_capacity(denominator.len());
        for factor in &denominator {
            let mut s = String::new();
            write_factor(&mut s, &factor.symbol, -factor.exponent);
            rendered.push(s);
        }
        if rendered.len() == 1 {
            write!(f, "{}/{}", numerator, rendered[0])
        } else {
            write!(f, "{}/({})", numerator, rendered.join("*"))
        }
    }
}
