//! Built-in function whitelist
//!
//! Uses a compile-time perfect hash map (phf) for name lookups. Only names in
//! this table (plus user functions defined earlier in the document) may be
//! called; any other `identifier(...)` is a parse error.

use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Sinh,
    Cosh,
    Tanh,
    Ln,
    Log,
    Exp,
    Abs,
    Min,
    Max,
    Sqrt,
}

/// Function metadata
#[derive(Debug, Clone, Copy)]
pub struct FunctionMetadata {
    pub function: Builtin,
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
}

static FUNCTIONS_BY_NAME: phf::Map<&'static str, FunctionMetadata> = phf_map! {
    "sin" => FunctionMetadata { function: Builtin::Sin, name: "sin", min_args: 1, max_args: Some(1) },
    "cos" => FunctionMetadata { function: Builtin::Cos, name: "cos", min_args: 1, max_args: Some(1) },
    "tan" => FunctionMetadata { function: Builtin::Tan, name: "tan", min_args: 1, max_args: Some(1) },
    "arcsin" => FunctionMetadata { function: Builtin::Arcsin, name: "arcsin", min_args: 1, max_args: Some(1) },
    "arccos" => FunctionMetadata { function: Builtin::Arccos, name: "arccos", min_args: 1, max_args: Some(1) },
    "arctan" => FunctionMetadata { function: Builtin::Arctan, name: "arctan", min_args: 1, max_args: Some(1) },
    "sinh" => FunctionMetadata { function: Builtin::Sinh, name: "sinh", min_args: 1, max_args: Some(1) },
    "cosh" => FunctionMetadata { function: Builtin::Cosh, name: "cosh", min_args: 1, max_args: Some(1) },
    "tanh" => FunctionMetadata { function: Builtin::Tanh, name: "tanh", min_args: 1, max_args: Some(1) },
    "ln" => FunctionMetadata { function: Builtin::Ln, name: "ln", min_args: 1, max_args: Some(1) },
    "log" => FunctionMetadata { function: Builtin::Log, name: "log", min_args: 1, max_args: Some(2) },
    "exp" => FunctionMetadata { function: Builtin::Exp, name: "exp", min_args: 1, max_args: Some(1) },
    "abs" => FunctionMetadata { function: Builtin::Abs, name: "abs", min_args: 1, max_args: Some(1) },
    "min" => FunctionMetadata { function: Builtin::Min, name: "min", min_args: 1, max_args: None },
    "max" => FunctionMetadata { function: Builtin::Max, name: "max", min_args: 1, max_args: None },
    "sqrt" => FunctionMetadata { function: Builtin::Sqrt, name: "sqrt", min_args: 1, max_args: Some(1) },
};

pub fn lookup(name: &str) -> Option<&'static FunctionMetadata> {
    FUNCTIONS_BY_NAME.get(name.strip_prefix('\\').unwrap_or(name))
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

impl FunctionMetadata {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Applies the function to dimensionless arguments. Arity is checked by
    /// the caller; domain errors come back as `Err(message)`.
    pub fn apply(&self, args: &[f64]) -> std::result::Result<f64, &'static str> {
        let x = args.first().copied().unwrap_or(f64::NAN);
        let value = match self.function {
            Builtin::Sin => x.sin(),
            Builtin::Cos => x.cos(),
            Builtin::Tan => x.tan(),
            Builtin::Arcsin | Builtin::Arccos if !(-1.0..=1.0).contains(&x) => {
                return Err("argument must lie in [-1, 1]");
            }
            Builtin::Arcsin => x.asin(),
            Builtin::Arccos => x.acos(),
            Builtin::Arctan => x.atan(),
            Builtin::Sinh => x.sinh(),
            Builtin::Cosh => x.cosh(),
            Builtin::Tanh => x.tanh(),
            Builtin::Ln | Builtin::Log if x <= 0.0 => return Err("argument must be positive"),
            Builtin::Ln => x.ln(),
            Builtin::Log => match args.get(1) {
                None => x.log10(),
                Some(base) if *base > 0.0 && *base != 1.0 => x.log(*base),
                Some(_) => return Err("base must be positive and not 1"),
            },
            Builtin::Exp => x.exp(),
            Builtin::Abs => x.abs(),
            Builtin::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Builtin::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Builtin::Sqrt if x < 0.0 => return Err("argument must not be negative"),
            Builtin::Sqrt => x.sqrt(),
        };
        Ok(value)
    }
}
