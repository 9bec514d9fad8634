//! The unit registry: built-in units, SI prefixes, document-defined units,
//! and the policy deciding which unit names may be reused as symbols.

use crate::ast::{Atom, Term, UnitSyntax};
use crate::builtin::{self, BuiltinUnit, PREFIXES, UNITS};
use crate::dimension::DimensionVector;
use crate::error::{Error, Result};
use crate::parser::{self, is_symbol_char};
use crate::quantity::Quantity;
use crate::unit::UnitExpr;
use lru::LruCache;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(n) => n,
    None => unreachable!(),
};

/// Unit names that may also be used as variable names in expressions.
pub const DEFAULT_SHADOWABLE: &[&str] = &["m", "s", "g", "t", "h", "d", "F"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum UnitKind {
    /// A base dimension of its own (`m`, `kg`, or `EUR === EUR`).
    Base,
    /// A scaled version of another unit (`bar === 100000 Pa`).
    Derived,
    /// A product or quotient of other units (`N`, `kWh === kW*h`).
    Compound,
    /// Another name for an existing unit (`Ohm`, `l`).
    Alias,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnitKind::Base => "base",
            UnitKind::Derived => "derived",
            UnitKind::Compound => "compound",
            UnitKind::Alias => "alias",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    pub name: String,
    pub kind: UnitKind,
    pub dims: DimensionVector,
    /// Multiplier from one of this unit to the coherent base units of `dims`.
    pub scale_to_base: f64,
    /// How the definition was written (`100000 Pa`), or the name for base units.
    pub display_form: String,
    /// 1-based document line for custom units, `None` for built-ins.
    pub defined_at_line: Option<usize>,
    pub prefixable: bool,
}

impl RegistryEntry {
    pub fn is_builtin(&self) -> bool {
        self.defined_at_line.is_none()
    }

    fn from_builtin(unit: &BuiltinUnit) -> Self {
        Self {
            name: unit.symbol.to_string(),
            kind: unit.kind,
            dims: DimensionVector::from_si(unit.si),
            scale_to_base: unit.scale,
            display_form: unit.symbol.to_string(),
            defined_at_line: None,
            prefixable: unit.prefixable,
        }
    }
}

/// Which built-in unit names a document may reuse as variable names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionPolicy {
    shadowable: BTreeSet<String>,
}

impl CollisionPolicy {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shadowable: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Every unit name is reserved.
    pub fn strict() -> Self {
        Self {
            shadowable: BTreeSet::new(),
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        self.shadowable.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shadowable.iter().map(String::as_str)
    }
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SHADOWABLE.iter().copied())
    }
}

static CANONICAL: Lazy<HashMap<DimensionVector, &'static str>> = Lazy::new(|| {
    UNITS
        .iter()
        .filter(|u| u.coherent)
        .map(|u| (DimensionVector::from_si(u.si), u.symbol))
        .collect()
});

/// Named coherent SI unit for a dimension vector (`N` for kg·m/s²), if any.
pub fn best_named_unit(dims: &DimensionVector) -> Option<&'static str> {
    CANONICAL.get(dims).copied()
}

pub struct UnitRegistry {
    entries: HashMap<String, RegistryEntry>,
    custom_order: Vec<String>,
    custom_dimensions: Vec<String>,
    policy: CollisionPolicy,
    cache: Mutex<LruCache<String, Option<UnitExpr>>>,
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.entries.len())
            .field("custom", &self.custom_order)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::with_policy(CollisionPolicy::default())
    }

    pub fn with_policy(policy: CollisionPolicy) -> Self {
        let entries = UNITS
            .iter()
            .map(|u| (u.symbol.to_string(), RegistryEntry::from_builtin(u)))
            .collect();
        Self {
            entries,
            custom_order: Vec::new(),
            custom_dimensions: Vec::new(),
            policy,
            cache: Mutex::new(LruCache::new(CACHE_CAPACITY)),
        }
    }

    pub fn policy(&self) -> &CollisionPolicy {
        &self.policy
    }

    /// Whether `name` is a unit: built-in, prefixed built-in, or custom.
    pub fn is_unit(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Custom units in definition order.
    pub fn custom_entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.custom_order.iter().filter_map(|n| self.entries.get(n))
    }

    /// Names of the custom base dimensions, in slot order.
    pub fn custom_dimension_names(&self) -> &[String] {
        &self.custom_dimensions
    }

    /// Resolves one unit symbol. Exact names win over prefixed readings.
    pub fn lookup(&self, symbol: &str) -> Option<UnitExpr> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(symbol) {
                return hit.clone();
            }
        }
        let resolved = self.lookup_uncached(symbol);
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(symbol.to_string(), resolved.clone());
        }
        resolved
    }

    fn lookup_uncached(&self, symbol: &str) -> Option<UnitExpr> {
        if let Some(entry) = self.entries.get(symbol) {
            return Some(UnitExpr::atom(
                symbol,
                entry.dims.clone(),
                entry.scale_to_base,
            ));
        }
        PREFIXES.iter().find_map(|prefix| {
            let rest = symbol.strip_prefix(prefix.symbol)?;
            let entry = self.entries.get(rest).filter(|e| e.prefixable)?;
            Some(UnitExpr::atom(
                symbol,
                entry.dims.clone(),
                entry.scale_to_base * prefix.factor,
            ))
        })
    }

    /// Short human description used in collision and duplicate messages.
    pub fn describe(&self, name: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(name) {
            return Some(match entry.defined_at_line {
                Some(line) => format!("'{}' ({} unit defined on line {})", name, entry.kind, line),
                None => format!("'{}' ({} unit)", name, entry.kind),
            });
        }
        PREFIXES.iter().find_map(|prefix| {
            let rest = name.strip_prefix(prefix.symbol)?;
            self.entries
                .get(rest)
                .filter(|e| e.prefixable)
                .map(|_| format!("'{}' ({}-prefixed '{}')", name, builtin::prefix_name(prefix.symbol), rest))
        })
    }

    /// Resolves a written unit expression such as `kg*m/s^2`.
    pub fn resolve(&self, text: &str) -> Result<UnitExpr> {
        let syntax = parser::parse(text)?;
        self.evaluate(&syntax)
    }

    fn evaluate(&self, syntax: &UnitSyntax) -> Result<UnitExpr> {
        let mut out = UnitExpr::one();
        for (term, exponent) in &syntax.numerator {
            out = out.mul(&self.evaluate_term(term)?.pow(*exponent)?)?;
        }
        for (term, exponent) in &syntax.denominator {
            out = out.div(&self.evaluate_term(term)?.pow(*exponent)?)?;
        }
        Ok(out)
    }

    fn evaluate_term(&self, term: &Term) -> Result<UnitExpr> {
        match term {
            Term::Group(inner) => self.evaluate(inner),
            Term::Atom(Atom::Integer(n)) => Ok(UnitExpr::one().scaled(*n as f64)),
            Term::Atom(Atom::Symbol(s)) => self
                .lookup(s)
                .ok_or_else(|| Error::UnknownUnit(s.clone())),
        }
    }

    /// Checks that `name` may be bound as a symbol in an expression.
    pub fn check_symbol_name(&self, name: &str) -> Result<()> {
        if !self.is_unit(name) {
            return Ok(());
        }
        let builtin = self.entries.get(name).is_some_and(RegistryEntry::is_builtin);
        if builtin && self.policy.allows(name) {
            return Ok(());
        }
        Err(Error::ReservedName {
            name: name.to_string(),
            unit: self.describe(name).unwrap_or_else(|| format!("'{}'", name)),
        })
    }

    /// Registers `name === definition`. A definition equal to the name (or
    /// empty) declares a new base dimension.
    pub fn define_custom_unit(
        &mut self,
        name: &str,
        definition: &str,
        line: Option<usize>,
    ) -> Result<UnitKind> {
        if name.is_empty() || !name.chars().all(is_symbol_char) {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.is_unit(name) {
            return Err(Error::DuplicateUnit {
                name: name.to_string(),
                existing: self.describe(name).unwrap_or_else(|| name.to_string()),
            });
        }

        let definition = definition.trim();
        let entry = if definition.is_empty() || definition == name {
            let slot = self.custom_dimensions.len();
            self.custom_dimensions.push(name.to_string());
            RegistryEntry {
                name: name.to_string(),
                kind: UnitKind::Base,
                dims: DimensionVector::custom(slot),
                scale_to_base: 1.0,
                display_form: name.to_string(),
                defined_at_line: line,
                prefixable: false,
            }
        } else {
            let (factor, rest) = split_leading_number(definition);
            let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '·' | '×'));
            let (kind, unit) = if rest.is_empty() {
                (UnitKind::Derived, UnitExpr::one())
            } else {
                let syntax = parser::parse(rest)?;
                let unit = self.evaluate(&syntax)?;
                let kind = match (syntax.as_single_symbol(), factor) {
                    (Some(_), None) => UnitKind::Alias,
                    (Some(_), Some(f)) if f == 1.0 => UnitKind::Alias,
                    (Some(_), Some(_)) => UnitKind::Derived,
                    (None, _) => UnitKind::Compound,
                };
                (kind, unit)
            };
            let scale = factor.unwrap_or(1.0) * unit.scale();
            if !scale.is_finite() || scale == 0.0 {
                return Err(Error::Overflow);
            }
            RegistryEntry {
                name: name.to_string(),
                kind,
                dims: unit.dims().clone(),
                scale_to_base: scale,
                display_form: definition.to_string(),
                defined_at_line: line,
                prefixable: false,
            }
        };

        tracing::debug!(unit = name, kind = %entry.kind, scale = entry.scale_to_base, "custom unit defined");
        let kind = entry.kind;
        self.entries.insert(name.to_string(), entry);
        self.custom_order.push(name.to_string());
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        Ok(kind)
    }

    pub fn convert(&self, quantity: &Quantity, target: &str) -> Result<Quantity> {
        let unit = self.resolve(target)?;
        quantity.convert_to(&unit)
    }

    pub fn to_base(&self, quantity: &Quantity) -> Quantity {
        quantity.to_base(&self.custom_dimensions)
    }

    /// Re-expresses a product of several units in the matching named SI unit
    /// (`kg*m/s^2` becomes `N`). Single-factor units are left as written.
    pub fn simplify(&self, quantity: Quantity) -> Quantity {
        let Some(unit) = &quantity.unit else {
            return quantity;
        };
        if unit.factors().len() < 2 {
            return quantity;
        }
        match best_named_unit(unit.dims()).and_then(|name| self.lookup(name)) {
            Some(named) => quantity.convert_to(&named).unwrap_or(quantity),
            None => quantity,
        }
    }
}

/// Splits `0.001 bar` into `(Some(0.001), " bar")`. The longest leading run
/// that parses as a number wins, so `2eV` reads as `2` and `eV`.
fn split_leading_number(text: &str) -> (Option<f64>, &str) {
    let run = text
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    (1..=run)
        .rev()
        .find_map(|end| {
            text[..end]
                .parse::<f64>()
                .ok()
                .map(|n| (Some(n), &text[end..]))
        })
        .unwrap_or((None, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_lookup_prefers_exact_names() {
        let reg = UnitRegistry::new();
        assert_eq!(reg.lookup("min").unwrap().scale(), 60.0);
        assert_eq!(reg.lookup("mm").unwrap().scale(), 1e-3);
        assert_eq!(reg.lookup("Pa").unwrap().scale(), 1.0);
        assert!((reg.lookup("dam").unwrap().scale() - 10.0).abs() < 1e-12);
        assert!(reg.lookup("kkg").is_none());
    }

    #[test]
    fn leading_number_split() {
        assert_eq!(split_leading_number("0.001 bar"), (Some(0.001), " bar"));
        assert_eq!(split_leading_number("2eV"), (Some(2.0), "eV"));
        assert_eq!(split_leading_number("kW*h"), (None, "kW*h"));
    }

    #[test]
    fn canonical_names_cover_force_and_energy() {
        assert_eq!(best_named_unit(&DimensionVector::from_si([1, 1, -2, 0, 0, 0, 0])), Some("N"));
        assert_eq!(best_named_unit(&DimensionVector::from_si([2, 1, -2, 0, 0, 0, 0])), Some("J"));
        assert_eq!(best_named_unit(&DimensionVector::from_si([1, 0, 0, 0, 0, 0, 0])), None);
    }
}
