use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unit expression must not be empty")]
    Empty,

    #[error("invalid unit syntax at byte {pos}: {message}")]
    Syntax { pos: usize, message: &'static str },

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("incompatible units: '{from}' vs '{to}'")]
    Incompatible { from: String, to: String },

    #[error("exponent {exponent} cannot be applied to dimensioned unit '{unit}'")]
    InvalidExponent { unit: String, exponent: f64 },

    #[error("'{name}' is already a unit ({existing})")]
    DuplicateUnit { name: String, existing: String },

    #[error("invalid unit name '{0}'")]
    InvalidName(String),

    #[error("'{name}' is reserved: it names the unit {unit}")]
    ReservedName { name: String, unit: String },

    #[error("numeric overflow")]
    Overflow,

    #[error("exponent of '{unit}' is out of range")]
    ExponentOverflow { unit: String },
}
