//! Units and dimensions for calcmark documents.
//!
//! A [`UnitRegistry`] resolves written unit expressions (`kg*m/s^2`, `km/h`)
//! into [`UnitExpr`] values carrying a [`DimensionVector`] and a scale to
//! coherent base units. [`Quantity`] implements dimension-checked arithmetic.
#![forbid(unsafe_code)]

mod ast;
mod builtin;
mod dimension;
mod error;
mod parser;
mod quantity;
mod registry;
mod unit;

pub use ast::{Atom, Term, UnitSyntax};
pub use dimension::{BaseDimension, DimensionVector, SI_BASE_DIMENSIONS};
pub use error::{Error, Result};
pub use parser::{parse, validate};
pub use quantity::{rational_exponent, Quantity};
pub use registry::{
    best_named_unit, CollisionPolicy, RegistryEntry, UnitKind, UnitRegistry, DEFAULT_SHADOWABLE,
};
pub use unit::{UnitExpr, UnitFactor};
