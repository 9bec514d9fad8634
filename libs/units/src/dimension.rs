use num_rational::Rational32;
use num_traits::{CheckedAdd, CheckedMul, Zero};
use smallvec::SmallVec;

/// Number of fixed SI base dimensions. Custom base dimensions (e.g. a
/// currency declared with `EUR === EUR`) occupy slots after these.
pub const SI_BASE_DIMENSIONS: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
    Current,
    Temperature,
    Substance,
    Luminosity,
}

impl BaseDimension {
    pub const ALL: [BaseDimension; SI_BASE_DIMENSIONS] = [
        BaseDimension::Length,
        BaseDimension::Mass,
        BaseDimension::Time,
        BaseDimension::Current,
        BaseDimension::Temperature,
        BaseDimension::Substance,
        BaseDimension::Luminosity,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Coherent SI unit symbol for this dimension.
    pub fn symbol(self) -> &'static str {
        match self {
            BaseDimension::Length => "m",
            BaseDimension::Mass => "kg",
            BaseDimension::Time => "s",
            BaseDimension::Current => "A",
            BaseDimension::Temperature => "K",
            BaseDimension::Substance => "mol",
            BaseDimension::Luminosity => "cd",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseDimension::Length => "length",
            BaseDimension::Mass => "mass",
            BaseDimension::Time => "time",
            BaseDimension::Current => "current",
            BaseDimension::Temperature => "temperature",
            BaseDimension::Substance => "substance",
            BaseDimension::Luminosity => "luminosity",
        }
    }
}

/// Exponents of the base dimensions, indexed by slot.
///
/// Trailing zero slots are never stored, so two vectors describing the same
/// physical dimension always compare (and hash) equal regardless of how many
/// custom dimensions the registry knows about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DimensionVector(SmallVec<[Rational32; 8]>);

impl DimensionVector {
    pub fn dimensionless() -> Self {
        Self(SmallVec::new())
    }

    pub fn base(dim: BaseDimension) -> Self {
        Self::unit_slot(dim.index())
    }

    /// Vector for the `slot`-th custom base dimension.
    pub fn custom(slot: usize) -> Self {
        Self::unit_slot(SI_BASE_DIMENSIONS + slot)
    }

    /// Builds a vector from integer SI exponents in `BaseDimension::ALL` order.
    pub fn from_si(exponents: [i32; SI_BASE_DIMENSIONS]) -> Self {
        let mut out = Self(exponents.iter().map(|e| Rational32::from_integer(*e)).collect());
        out.normalize();
        out
    }

    fn unit_slot(index: usize) -> Self {
        let mut slots: SmallVec<[Rational32; 8]> = SmallVec::new();
        slots.resize(index + 1, Rational32::zero());
        slots[index] = Rational32::from_integer(1);
        Self(slots)
    }

    pub fn exponent(&self, slot: usize) -> Rational32 {
        self.0.get(slot).copied().unwrap_or_else(Rational32::zero)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-zero `(slot, exponent)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Rational32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_zero())
            .map(|(i, e)| (i, *e))
    }

    /// Product of dimensions; `None` when an exponent leaves the `i32` range.
    pub fn mul(&self, other: &Self) -> Option<Self> {
        let len = self.0.len().max(other.0.len());
        let slots = (0..len)
            .map(|i| self.exponent(i).checked_add(&other.exponent(i)))
            .collect::<Option<SmallVec<_>>>()?;
        let mut out = Self(slots);
        out.normalize();
        Some(out)
    }

    pub fn div(&self, other: &Self) -> Option<Self> {
        self.mul(&other.pow(Rational32::from_integer(-1))?)
    }

    pub fn pow(&self, exponent: Rational32) -> Option<Self> {
        let slots = self
            .0
            .iter()
            .map(|e| e.checked_mul(&exponent))
            .collect::<Option<SmallVec<_>>>()?;
        let mut out = Self(slots);
        out.normalize();
        Some(out)
    }

    fn normalize(&mut self) {
        while self.0.last().is_some_and(|e| e.is_zero()) {
            self.0.pop();
        }
    }
}
