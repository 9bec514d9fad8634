//! Embedded unit table: SI base and derived units, a handful of common
//! non-SI units, and the SI prefixes.
//!
//! Exponent arrays are in `BaseDimension::ALL` order:
//! length, mass, time, current, temperature, substance, luminosity.

use crate::registry::UnitKind;

pub(crate) struct BuiltinUnit {
    pub symbol: &'static str,
    pub si: [i32; 7],
    pub scale: f64,
    pub prefixable: bool,
    pub kind: UnitKind,
    /// Coherent named unit that products/quotients collapse into.
    pub coherent: bool,
}

pub(crate) struct Prefix {
    pub symbol: &'static str,
    pub factor: f64,
}

const fn unit(
    symbol: &'static str,
    si: [i32; 7],
    scale: f64,
    prefixable: bool,
    kind: UnitKind,
) -> BuiltinUnit {
    BuiltinUnit {
        symbol,
        si,
        scale,
        prefixable,
        kind,
        coherent: false,
    }
}

const fn coherent(symbol: &'static str, si: [i32; 7]) -> BuiltinUnit {
    BuiltinUnit {
        symbol,
        si,
        scale: 1.0,
        prefixable: true,
        kind: UnitKind::Compound,
        coherent: true,
    }
}

const NONE: [i32; 7] = [0, 0, 0, 0, 0, 0, 0];
const DEG: f64 = std::f64::consts::PI / 180.0;

pub(crate) static UNITS: &[BuiltinUnit] = &[
    // SI base units
    unit("m", [1, 0, 0, 0, 0, 0, 0], 1.0, true, UnitKind::Base),
    unit("kg", [0, 1, 0, 0, 0, 0, 0], 1.0, false, UnitKind::Base),
    unit("s", [0, 0, 1, 0, 0, 0, 0], 1.0, true, UnitKind::Base),
    unit("A", [0, 0, 0, 1, 0, 0, 0], 1.0, true, UnitKind::Base),
    unit("K", [0, 0, 0, 0, 1, 0, 0], 1.0, true, UnitKind::Base),
    unit("mol", [0, 0, 0, 0, 0, 1, 0], 1.0, true, UnitKind::Base),
    unit("cd", [0, 0, 0, 0, 0, 0, 1], 1.0, true, UnitKind::Base),
    unit("g", [0, 1, 0, 0, 0, 0, 0], 1e-3, true, UnitKind::Derived),
    // Coherent derived units
    coherent("N", [1, 1, -2, 0, 0, 0, 0]),
    coherent("Pa", [-1, 1, -2, 0, 0, 0, 0]),
    coherent("J", [2, 1, -2, 0, 0, 0, 0]),
    coherent("W", [2, 1, -3, 0, 0, 0, 0]),
    coherent("C", [0, 0, 1, 1, 0, 0, 0]),
    coherent("V", [2, 1, -3, -1, 0, 0, 0]),
    coherent("F", [-2, -1, 4, 2, 0, 0, 0]),
    coherent("Ω", [2, 1, -3, -2, 0, 0, 0]),
    unit("Ohm", [2, 1, -3, -2, 0, 0, 0], 1.0, true, UnitKind::Alias),
    coherent("S", [-2, -1, 3, 2, 0, 0, 0]),
    coherent("Wb", [2, 1, -2, -1, 0, 0, 0]),
    coherent("T", [0, 1, -2, -1, 0, 0, 0]),
    coherent("H", [2, 1, -2, -2, 0, 0, 0]),
    unit("Hz", [0, 0, -1, 0, 0, 0, 0], 1.0, true, UnitKind::Compound),
    unit("Bq", [0, 0, -1, 0, 0, 0, 0], 1.0, true, UnitKind::Compound),
    unit("Gy", [2, 0, -2, 0, 0, 0, 0], 1.0, true, UnitKind::Compound),
    unit("Sv", [2, 0, -2, 0, 0, 0, 0], 1.0, true, UnitKind::Compound),
    unit("kat", [0, 0, -1, 0, 0, 1, 0], 1.0, true, UnitKind::Compound),
    unit("lm", [0, 0, 0, 0, 0, 0, 1], 1.0, true, UnitKind::Compound),
    unit("lx", [-2, 0, 0, 0, 0, 0, 1], 1.0, true, UnitKind::Compound),
    // Dimensionless
    unit("rad", NONE, 1.0, true, UnitKind::Derived),
    unit("sr", NONE, 1.0, false, UnitKind::Derived),
    unit("deg", NONE, DEG, false, UnitKind::Derived),
    unit("°", NONE, DEG, false, UnitKind::Alias),
    unit("%", NONE, 0.01, false, UnitKind::Derived),
    unit("ppm", NONE, 1e-6, false, UnitKind::Derived),
    // Common non-SI units
    unit("min", [0, 0, 1, 0, 0, 0, 0], 60.0, false, UnitKind::Derived),
    unit("h", [0, 0, 1, 0, 0, 0, 0], 3600.0, false, UnitKind::Derived),
    unit("d", [0, 0, 1, 0, 0, 0, 0], 86400.0, false, UnitKind::Derived),
    unit("L", [3, 0, 0, 0, 0, 0, 0], 1e-3, true, UnitKind::Derived),
    unit("l", [3, 0, 0, 0, 0, 0, 0], 1e-3, true, UnitKind::Alias),
    unit("t", [0, 1, 0, 0, 0, 0, 0], 1e3, false, UnitKind::Derived),
    unit("bar", [-1, 1, -2, 0, 0, 0, 0], 1e5, true, UnitKind::Derived),
    unit("atm", [-1, 1, -2, 0, 0, 0, 0], 101_325.0, false, UnitKind::Derived),
    unit("psi", [-1, 1, -2, 0, 0, 0, 0], 6_894.757_293_168, false, UnitKind::Derived),
    unit("Wh", [2, 1, -2, 0, 0, 0, 0], 3600.0, true, UnitKind::Derived),
    unit("eV", [2, 1, -2, 0, 0, 0, 0], 1.602_176_634e-19, true, UnitKind::Derived),
    unit("in", [1, 0, 0, 0, 0, 0, 0], 0.0254, false, UnitKind::Derived),
    unit("ft", [1, 0, 0, 0, 0, 0, 0], 0.3048, false, UnitKind::Derived),
    unit("mi", [1, 0, 0, 0, 0, 0, 0], 1609.344, false, UnitKind::Derived),
    unit("lb", [0, 1, 0, 0, 0, 0, 0], 0.453_592_37, false, UnitKind::Derived),
];

/// Longest symbols first so `da` wins over `d`.
pub(crate) static PREFIXES: &[Prefix] = &[
    Prefix { symbol: "da", factor: 1e1 },
    Prefix { symbol: "Y", factor: 1e24 },
    Prefix { symbol: "Z", factor: 1e21 },
    Prefix { symbol: "E", factor: 1e18 },
    Prefix { symbol: "P", factor: 1e15 },
    Prefix { symbol: "T", factor: 1e12 },
    Prefix { symbol: "G", factor: 1e9 },
    Prefix { symbol: "M", factor: 1e6 },
    Prefix { symbol: "k", factor: 1e3 },
    Prefix { symbol: "h", factor: 1e2 },
    Prefix { symbol: "d", factor: 1e-1 },
    Prefix { symbol: "c", factor: 1e-2 },
    Prefix { symbol: "m", factor: 1e-3 },
    Prefix { symbol: "µ", factor: 1e-6 },
    Prefix { symbol: "μ", factor: 1e-6 },
    Prefix { symbol: "u", factor: 1e-6 },
    Prefix { symbol: "n", factor: 1e-9 },
    Prefix { symbol: "p", factor: 1e-12 },
    Prefix { symbol: "f", factor: 1e-15 },
    Prefix { symbol: "a", factor: 1e-18 },
];

pub(crate) fn prefix_name(symbol: &str) -> &'static str {
    match symbol {
        "da" => "deca",
        "Y" => "yotta",
        "Z" => "zetta",
        "E" => "exa",
        "P" => "peta",
        "T" => "tera",
        "G" => "giga",
        "M" => "mega",
        "k" => "kilo",
        "h" => "hecto",
        "d" => "deci",
        "c" => "centi",
        "m" => "milli",
        "µ" | "μ" | "u" => "micro",
        "n" => "nano",
        "p" => "pico",
        "f" => "femto",
        "a" => "atto",
        _ => "unknown",
    }
}
