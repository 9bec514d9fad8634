use crate::dimension::DimensionVector;
use crate::error::{Error, Result};
use crate::unit::UnitExpr;
use num_rational::Rational32;

/// Largest denominator accepted when an `f64` exponent is applied to a
/// dimensioned quantity (`m^0.5` is fine, `m^0.123` is not).
const MAX_EXPONENT_DENOMINATOR: i32 = 12;

/// A magnitude paired with an optional unit. `unit == None` is a pure number.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: Option<UnitExpr>,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: UnitExpr) -> Self {
        Self {
            magnitude,
            unit: Some(unit),
        }
    }

    pub fn dimensionless(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: None,
        }
    }

    pub fn dims(&self) -> DimensionVector {
        self.unit
            .as_ref()
            .map(|u| u.dims().clone())
            .unwrap_or_default()
    }

    pub fn scale(&self) -> f64 {
        self.unit.as_ref().map_or(1.0, UnitExpr::scale)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.unit.as_ref().map_or(true, UnitExpr::is_dimensionless)
    }

    /// Magnitude expressed in coherent base units.
    pub fn base_magnitude(&self) -> f64 {
        self.magnitude * self.scale()
    }

    pub fn unit_label(&self) -> String {
        self.unit
            .as_ref()
            .map_or_else(|| "1".to_string(), UnitExpr::to_string)
    }

    /// Sum expressed in `self`'s unit.
    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        let rhs = other.in_unit_of(self)?;
        Ok(Quantity {
            magnitude: self.magnitude + rhs,
            unit: self.unit.clone(),
        })
    }

    pub fn sub(&self, other: &Quantity) -> Result<Quantity> {
        let rhs = other.in_unit_of(self)?;
        Ok(Quantity {
            magnitude: self.magnitude - rhs,
            unit: self.unit.clone(),
        })
    }

    fn in_unit_of(&self, target: &Quantity) -> Result<f64> {
        if self.dims() != target.dims() {
            return Err(Error::Incompatible {
                from: target.unit_label(),
                to: self.unit_label(),
            });
        }
        Ok(self.magnitude * self.scale() / target.scale())
    }

    pub fn neg(&self) -> Quantity {
        Quantity {
            magnitude: -self.magnitude,
            unit: self.unit.clone(),
        }
    }

    pub fn mul(&self, other: &Quantity) -> Result<Quantity> {
        let magnitude = self.magnitude * other.magnitude;
        Ok(match (&self.unit, &other.unit) {
            (None, None) => Quantity::dimensionless(magnitude),
            (Some(u), None) | (None, Some(u)) => Quantity::new(magnitude, u.clone()),
            (Some(u), Some(v)) => fold_cancelled(magnitude, u.mul(v)?),
        })
    }

    /// Quotient. A zero divisor is the caller's concern; this returns the IEEE result.
    pub fn div(&self, other: &Quantity) -> Result<Quantity> {
        let magnitude = self.magnitude / other.magnitude;
        Ok(match (&self.unit, &other.unit) {
            (None, None) => Quantity::dimensionless(magnitude),
            (Some(u), None) => Quantity::new(magnitude, u.clone()),
            (None, Some(v)) => Quantity::new(magnitude, UnitExpr::one().div(v)?),
            (Some(u), Some(v)) => fold_cancelled(magnitude, u.div(v)?),
        })
    }

    pub fn pow(&self, exponent: f64) -> Result<Quantity> {
        match &self.unit {
            None => Ok(Quantity::dimensionless(self.magnitude.powf(exponent))),
            Some(u) if u.is_dimensionless() => Ok(Quantity::dimensionless(
                (self.magnitude * u.scale()).powf(exponent),
            )),
            Some(u) => {
                let ratio = rational_exponent(exponent).ok_or_else(|| Error::InvalidExponent {
                    unit: u.to_string(),
                    exponent,
                })?;
                Ok(Quantity::new(self.magnitude.powf(exponent), u.pow(ratio)?))
            }
        }
    }

    pub fn convert_to(&self, target: &UnitExpr) -> Result<Quantity> {
        if &self.dims() != target.dims() {
            return Err(Error::Incompatible {
                from: self.unit_label(),
                to: target.to_string(),
            });
        }
        Ok(Quantity::new(
            self.base_magnitude() / target.scale(),
            target.clone(),
        ))
    }

    /// Same quantity in coherent base units. Dimensionless results drop the unit.
    pub fn to_base(&self, custom_names: &[String]) -> Quantity {
        match &self.unit {
            Some(u) if !u.is_dimensionless() => {
                Quantity::new(self.base_magnitude(), u.base_form(custom_names))
            }
            _ => Quantity::dimensionless(self.base_magnitude()),
        }
    }
}

/// When both operands carried units and their dimensions cancel, the
/// remaining scale belongs in the magnitude.
fn fold_cancelled(magnitude: f64, unit: UnitExpr) -> Quantity {
    if unit.is_dimensionless() {
        Quantity::dimensionless(magnitude * unit.scale())
    } else {
        Quantity::new(magnitude, unit)
    }
}

/// Closest `p/q` with `q <= MAX_EXPONENT_DENOMINATOR`, if `value` is one.
pub fn rational_exponent(value: f64) -> Option<Rational32> {
    if !value.is_finite() {
        return None;
    }
    (1..=MAX_EXPONENT_DENOMINATOR).find_map(|denom| {
        let scaled = value * f64::from(denom);
        let numer = scaled.round();
        if (scaled - numer).abs() < 1e-9 && numer.abs() <= f64::from(i32::MAX) {
            Some(Rational32::new(numer as i32, denom))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::BaseDimension;

    fn metre() -> UnitExpr {
        UnitExpr::atom("m", DimensionVector::base(BaseDimension::Length), 1.0)
    }

    fn km() -> UnitExpr {
        UnitExpr::atom("km", DimensionVector::base(BaseDimension::Length), 1000.0)
    }

    #[test]
    fn addition_uses_left_unit() {
        let sum = Quantity::new(1.0, km()).add(&Quantity::new(500.0, metre())).unwrap();
        assert_eq!(sum.magnitude, 1.5);
        assert_eq!(sum.unit_label(), "km");
    }

    #[test]
    fn addition_rejects_mismatched_dimensions() {
        let err = Quantity::new(1.0, metre())
            .add(&Quantity::dimensionless(2.0))
            .unwrap_err();
        assert!(matches!(err, Error::Incompatible { .. }));
    }

    #[test]
    fn cancelled_units_fold_scale() {
        let ratio = Quantity::new(1.0, km())
            .div(&Quantity::new(1.0, metre()))
            .unwrap();
        assert!(ratio.unit.is_none());
        assert_eq!(ratio.magnitude, 1000.0);
    }

    #[test]
    fn fractional_powers_need_small_denominators() {
        let area = Quantity::new(4.0, metre().pow(Rational32::from_integer(2)).unwrap());
        let side = area.pow(0.5).unwrap();
        assert_eq!(side.magnitude, 2.0);
        assert_eq!(side.unit_label(), "m");
        assert!(matches!(area.pow(0.123), Err(Error::InvalidExponent { .. })));
    }

    #[test]
    fn conversion_between_scales() {
        let q = Quantity::new(2500.0, metre()).convert_to(&km()).unwrap();
        assert_eq!(q.magnitude, 2.5);
    }

    #[test]
    fn rational_exponent_recovers_thirds() {
        assert_eq!(rational_exponent(1.0 / 3.0), Some(Rational32::new(1, 3)));
        assert_eq!(rational_exponent(2.0), Some(Rational32::from_integer(2)));
        assert_eq!(rational_exponent(f64::NAN), None);
    }
}
