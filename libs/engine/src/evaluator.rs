//! Tree-walking evaluator
//!
//! Pure and deterministic: resolves variables against the symbol table,
//! units against the registry, and propagates dimensions through every
//! operation. A deadline is checked at every node.
//!
//! Failures are tagged with the position of the innermost node that
//! records one. Positions inside a called function's body belong to another
//! statement, so those failures are tagged at the call site instead.

use crate::ast::{BinaryOp, Expr, Span, UnaryOp};
use crate::error::{Error, Result};
use crate::functions;
use crate::symbols::{canonical_name, Lookup, SymbolData, SymbolTable};
use calcmark_units::{Quantity, UnitExpr, UnitRegistry};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct EvalOptions {
    /// Per-expression budget; `None` disables the check.
    pub timeout: Option<Duration>,
    /// Maximum nesting for parsing and evaluation.
    pub max_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(2000)),
            max_depth: crate::parser::MAX_RECURSION_DEPTH,
        }
    }
}

pub struct Evaluator<'a> {
    symbols: &'a SymbolTable,
    units: &'a UnitRegistry,
    /// Parameter bindings of the user-function calls in progress.
    scopes: Vec<HashMap<String, Quantity>>,
    deadline: Option<Instant>,
    limit_ms: u64,
    depth: usize,
    max_depth: usize,
    lenient_units: bool,
    unresolved_units: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(symbols: &'a SymbolTable, units: &'a UnitRegistry, options: &EvalOptions) -> Self {
        Self {
            symbols,
            units,
            scopes: Vec::new(),
            deadline: options.timeout.map(|t| Instant::now() + t),
            limit_ms: options
                .timeout
                .map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            depth: 0,
            max_depth: options.max_depth,
            lenient_units: false,
            unresolved_units: Vec::new(),
        }
    }

    /// Unknown units become opaque placeholders instead of errors; they are
    /// collected in [`Evaluator::unresolved_units`].
    pub fn lenient(mut self) -> Self {
        self.lenient_units = true;
        self
    }

    pub fn unresolved_units(&self) -> &[String] {
        &self.unresolved_units
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Quantity> {
        let quantity = self.eval(expr)?;
        if !quantity.magnitude.is_finite() {
            return Err(Error::NonFinite);
        }
        Ok(quantity)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Error::parse(
                format!("expression too deeply nested (max depth: {})", self.max_depth),
                0,
                0,
            ));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::Timeout {
                limit_ms: self.limit_ms,
            });
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Quantity> {
        self.enter()?;
        let result = self.eval_node(expr);
        self.depth -= 1;
        result.map_err(|err| self.locate(err, expr.span()))
    }

    fn locate(&self, err: Error, span: Option<Span>) -> Error {
        match span {
            Some(span) if self.scopes.is_empty() => err.at(span.start),
            _ => err,
        }
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Quantity> {
        match expr {
            Expr::Number(value) => Ok(Quantity::dimensionless(*value)),
            Expr::Variable { name, .. } => self.variable(name),
            Expr::Group(inner) => self.eval(inner),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Ok(self.eval(operand)?.neg()),
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*op, left, right)
            }
            Expr::Fraction {
                numerator,
                denominator,
                ..
            } => {
                let numerator = self.eval(numerator)?;
                let denominator = self.eval(denominator)?;
                self.binary(BinaryOp::Div, numerator, denominator)
            }
            Expr::UnitAttach { expr, unit, .. } => {
                let inner = self.eval(expr)?;
                self.attach_unit(inner, unit)
            }
            Expr::Call { name, args } => self.call(name, args),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: Quantity, right: Quantity) -> Result<Quantity> {
        match op {
            BinaryOp::Add => Ok(left.add(&right)?),
            BinaryOp::Sub => Ok(left.sub(&right)?),
            BinaryOp::Mul => {
                let product = left.mul(&right)?;
                Ok(self.simplify(&left, &right, product))
            }
            BinaryOp::Div => {
                if right.magnitude == 0.0 {
                    return Err(Error::DivisionByZero { at: None });
                }
                let quotient = left.div(&right)?;
                Ok(self.simplify(&left, &right, quotient))
            }
            BinaryOp::Pow => {
                if !right.is_dimensionless() {
                    return Err(Error::InvalidExponent(format!(
                        "exponent must be dimensionless, got [{}]",
                        right.unit_label()
                    )));
                }
                Ok(left.pow(right.base_magnitude())?)
            }
        }
    }

    /// Products and quotients of two unit-bearing operands are expressed in
    /// the matching named SI unit when there is one.
    fn simplify(&self, left: &Quantity, right: &Quantity, result: Quantity) -> Quantity {
        if left.unit.is_some() && right.unit.is_some() {
            self.units.simplify(result)
        } else {
            result
        }
    }

    fn attach_unit(&mut self, inner: Quantity, unit: &str) -> Result<Quantity> {
        if let Some(existing) = &inner.unit {
            return Err(Error::UnitAttachment(format!(
                "cannot attach [{}] to a value that already has unit [{}]",
                unit, existing
            )));
        }
        let resolved = match self.units.resolve(unit) {
            Ok(u) => u,
            Err(calcmark_units::Error::UnknownUnit(name)) if self.lenient_units => {
                tracing::debug!(unit, unknown = %name, "keeping unresolved unit opaque");
                self.unresolved_units.push(name);
                UnitExpr::opaque(unit)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Quantity::new(inner.magnitude, resolved))
    }

    fn variable(&self, name: &str) -> Result<Quantity> {
        if let Some(scope) = self.scopes.last() {
            if let Some(q) = scope
                .get(name)
                .or_else(|| scope.get(&canonical_name(name)))
            {
                return Ok(q.clone());
            }
        }
        match self.symbols.lookup(name) {
            Lookup::Missing => Err(Error::undefined(name, None)),
            Lookup::Invalid(reason) => Err(Error::undefined(name, Some(reason.to_string()))),
            Lookup::Found(entry) => match &entry.data {
                SymbolData::Value(v) if v.conversion_ok => Ok(v.original.clone()),
                SymbolData::Value(v) => Err(Error::Upstream {
                    name: entry.display_name.clone(),
                    reason: v
                        .conversion_error
                        .clone()
                        .unwrap_or_else(|| "unit conversion failed".to_string()),
                }),
                SymbolData::Formula(f) if f.is_function() => Err(Error::InvalidCall(format!(
                    "'{}' is a function; call it with {} argument(s)",
                    entry.display_name,
                    f.parameters.len()
                ))),
                SymbolData::Formula(f) => match (&f.result, &f.error) {
                    (Some(q), _) => Ok(q.clone()),
                    (None, Some(err)) => Err(Error::Upstream {
                        name: entry.display_name.clone(),
                        reason: err.to_string(),
                    }),
                    (None, None) => Err(Error::Upstream {
                        name: entry.display_name.clone(),
                        reason: "no result".to_string(),
                    }),
                },
                SymbolData::Parameter { .. } => Err(Error::undefined(
                    name,
                    Some("parameters are only visible inside their function".into()),
                )),
            },
        }
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Result<Quantity> {
        if let Some(meta) = functions::lookup(name) {
            if !meta.accepts(args.len()) {
                return Err(Error::InvalidCall(format!(
                    "{} does not take {} argument(s)",
                    meta.name,
                    args.len()
                )));
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let q = self.eval(arg)?;
                if !q.is_dimensionless() {
                    return Err(Error::FunctionArgument {
                        function: meta.name.to_string(),
                        message: format!("argument must be dimensionless, got [{}]", q.unit_label()),
                    });
                }
                values.push(q.base_magnitude());
            }
            return meta
                .apply(&values)
                .map(Quantity::dimensionless)
                .map_err(|message| Error::FunctionArgument {
                    function: meta.name.to_string(),
                    message: message.to_string(),
                });
        }

        let symbols = self.symbols;
        let entry = match symbols.lookup(name) {
            Lookup::Found(entry) => entry,
            Lookup::Invalid(reason) => {
                return Err(Error::undefined(name, Some(reason.to_string())))
            }
            Lookup::Missing => {
                return Err(Error::InvalidCall(format!("'{}' is not a known function", name)))
            }
        };
        let SymbolData::Formula(formula) = &entry.data else {
            return Err(Error::InvalidCall(format!("'{}' is not a function", name)));
        };
        if formula.parameter_names.len() != args.len() {
            return Err(Error::InvalidCall(format!(
                "{} takes {} argument(s), got {}",
                entry.display_name,
                formula.parameter_names.len(),
                args.len()
            )));
        }

        let mut scope = HashMap::with_capacity(args.len());
        for (param, arg) in formula.parameter_names.iter().zip(args) {
            let value = self.eval(arg)?;
            scope.insert(canonical_name(param), value.clone());
            scope.insert(param.clone(), value);
        }
        self.scopes.push(scope);
        let result = self.eval(&formula.body);
        self.scopes.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use std::collections::HashSet;

    fn eval(text: &str) -> Result<Quantity> {
        let symbols = SymbolTable::new();
        let units = UnitRegistry::new();
        let expr = parse_expression(text, &HashSet::new(), 200)?;
        Evaluator::new(&symbols, &units, &EvalOptions::default()).evaluate(&expr)
    }

    #[test]
    fn unit_attachment_scales_by_registry() {
        let q = eval("3 [km] + 500 [m]").unwrap();
        assert_eq!(q.magnitude, 3.5);
        assert_eq!(q.unit_label(), "km");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(eval("1 / 0"), Err(Error::DivisionByZero { at: Some(2) }));
        assert_eq!(
            eval("\\frac{1}{0 [m]}"),
            Err(Error::DivisionByZero { at: Some(0) })
        );
    }

    #[test]
    fn errors_point_at_the_failing_node() {
        assert_eq!(eval("2 * (1 + V)").unwrap_err().offset(), Some(9));
        assert_eq!(eval("1 [m] + 2 [kg]").unwrap_err().offset(), Some(6));
        assert_eq!(eval("1 + 3 [furlong]").unwrap_err().offset(), Some(6));
    }

    #[test]
    fn deep_trees_are_reported_as_parse_errors() {
        let symbols = SymbolTable::new();
        let units = UnitRegistry::new();
        let expr = parse_expression("((((1))))", &HashSet::new(), 200).unwrap();
        let options = EvalOptions {
            timeout: None,
            max_depth: 3,
        };
        let result = Evaluator::new(&symbols, &units, &options).evaluate(&expr);
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn dimensioned_exponent_is_rejected() {
        assert!(matches!(eval("2^(3 [m])"), Err(Error::InvalidExponent(_))));
    }

    #[test]
    fn sqrt_halves_dimensions() {
        let q = eval("\\sqrt{16 [m^2]}").unwrap();
        assert_eq!(q.magnitude, 4.0);
        assert_eq!(q.unit_label(), "m");
    }

    #[test]
    fn functions_require_dimensionless_arguments() {
        assert!(matches!(eval("sin(2 [m])"), Err(Error::FunctionArgument { .. })));
        let q = eval("\\sin(90 [deg])").unwrap();
        assert!((q.magnitude - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lenient_mode_keeps_unknown_units_opaque() {
        let symbols = SymbolTable::new();
        let units = UnitRegistry::new();
        let expr = parse_expression("3 [furlong]", &HashSet::new(), 200).unwrap();
        let mut ev = Evaluator::new(&symbols, &units, &EvalOptions::default()).lenient();
        let q = ev.evaluate(&expr).unwrap();
        assert_eq!(q.unit_label(), "furlong");
        assert_eq!(ev.unresolved_units(), ["furlong".to_string()]);
    }

    #[test]
    fn zero_timeout_expires() {
        let symbols = SymbolTable::new();
        let units = UnitRegistry::new();
        let expr = parse_expression("1 + 2", &HashSet::new(), 200).unwrap();
        let options = EvalOptions {
            timeout: Some(Duration::ZERO),
            max_depth: 200,
        };
        std::thread::sleep(Duration::from_millis(2));
        let result = Evaluator::new(&symbols, &units, &options).evaluate(&expr);
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
