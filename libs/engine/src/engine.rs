//! Per-pass engine
//!
//! Owns the unit registry and symbol table of one document pass and
//! executes statements in document order: Split → Tokenize → Parse →
//! Classify → Evaluate → Register.

use crate::ast::Expr;
use crate::error::{Error, Result};
use crate::evaluator::{EvalOptions, Evaluator};
use crate::ir::IrDocument;
use crate::lexer::{tokenize, LexMode};
use crate::parser::Parser;
use crate::statement::{Form, Piece, Statement};
use crate::symbolic::SymbolicBackend;
use crate::symbols::{
    canonical_name, FormulaRecord, InternalId, Lookup, SymbolData, SymbolTable, ValueRecord,
};
use crate::token::TokenKind;
use calcmark_units::{CollisionPolicy, Quantity, UnitKind, UnitRegistry};
use std::sync::Arc;

/// What a successfully executed statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Defined {
        id: InternalId,
    },
    Evaluated {
        /// Set when the statement also defined a symbol.
        id: Option<InternalId>,
        quantity: Quantity,
    },
    UnitDefined {
        name: String,
        kind: UnitKind,
    },
    Symbolic {
        output: Option<String>,
    },
}

/// Left-hand side of `:=`: a name, optionally with a parameter list.
#[derive(Debug, Clone, PartialEq)]
struct DefinitionTarget {
    name: String,
    params: Vec<String>,
}

/// Evaluation engine for one document pass.
///
/// Nothing is shared between passes: a fresh engine starts with only the
/// built-in units and an empty symbol table.
pub struct Engine {
    units: UnitRegistry,
    symbols: SymbolTable,
    options: EvalOptions,
    symbolic: Option<Arc<dyn SymbolicBackend>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CollisionPolicy::default(), EvalOptions::default())
    }
}

impl Engine {
    pub fn new(policy: CollisionPolicy, options: EvalOptions) -> Self {
        Self {
            units: UnitRegistry::with_policy(policy),
            symbols: SymbolTable::new(),
            options,
            symbolic: None,
        }
    }

    /// Backend that renders the output of `=>` regions.
    pub fn with_symbolic_backend(mut self, backend: Arc<dyn SymbolicBackend>) -> Self {
        self.symbolic = Some(backend);
        self
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn ir(&self) -> IrDocument {
        IrDocument::build(&self.symbols, &self.units)
    }

    /// Executes one statement found on document line `line` (1-based).
    ///
    /// Source positions in returned errors are byte offsets within the
    /// statement's content.
    pub fn execute(&mut self, statement: &Statement<'_>, line: usize) -> Result<Execution> {
        tracing::debug!(line, form = statement.form.label(), "executing statement");
        match &statement.form {
            Form::Invalid(err) => Err(err.clone()),
            Form::Define { name, body } => {
                let id = self.define(name, body, line)?;
                Ok(Execution::Defined { id })
            }
            Form::DefineEvaluate { name, body } => {
                let id = self.define(name, body, line)?;
                let quantity = self.result_of(id)?;
                Ok(Execution::Evaluated {
                    id: Some(id),
                    quantity,
                })
            }
            Form::Evaluate { expr } => {
                let quantity = self.evaluate_piece(expr)?;
                Ok(Execution::Evaluated { id: None, quantity })
            }
            Form::Symbolic { name, expr } => {
                let parsed = match name {
                    Some(name) => {
                        let id = self.define(name, expr, line)?;
                        match self.symbols.resolve(id).map(|e| &e.data) {
                            Some(SymbolData::Formula(f)) => f.body.clone(),
                            _ => self.parse_piece(expr)?,
                        }
                    }
                    None => self.parse_piece(expr)?,
                };
                let output = match &self.symbolic {
                    Some(backend) => backend.render(&parsed, &self.symbols)?,
                    None => None,
                };
                Ok(Execution::Symbolic { output })
            }
            Form::UnitDefinition { name, body } => self.define_unit(name, body, line),
        }
    }

    /// Tokenizes, parses and evaluates `text` against the current state
    /// without registering anything.
    pub fn evaluate(&self, text: &str) -> Result<Quantity> {
        let expr = self.parse_expression(text)?;
        Evaluator::new(&self.symbols, &self.units, &self.options).evaluate(&expr)
    }

    /// Converts a result to a display unit requested by the document.
    pub fn convert(&self, quantity: &Quantity, unit: &str) -> Result<Quantity> {
        self.units
            .convert(quantity, unit)
            .map_err(|err| Error::conversion(err, unit))
    }

    fn parse_expression(&self, text: &str) -> Result<Expr> {
        let tokens = tokenize(text, LexMode::Evaluation)?;
        Parser::new(tokens)
            .with_user_functions(self.symbols.function_names())
            .with_max_depth(self.options.max_depth)
            .parse()
    }

    /// Positions in the parsed tree and in errors are relative to the
    /// statement, not the piece.
    fn parse_piece(&self, piece: &Piece<'_>) -> Result<Expr> {
        let mut expr = self
            .parse_expression(piece.text)
            .map_err(|err| err.shifted(piece.offset))?;
        expr.shift_spans(piece.offset);
        Ok(expr)
    }

    fn evaluate_piece(&self, piece: &Piece<'_>) -> Result<Quantity> {
        let expr = self.parse_piece(piece)?;
        Evaluator::new(&self.symbols, &self.units, &self.options).evaluate(&expr)
    }

    fn result_of(&self, id: InternalId) -> Result<Quantity> {
        let Some(entry) = self.symbols.resolve(id) else {
            return Err(Error::undefined(id.to_string(), None));
        };
        match &entry.data {
            SymbolData::Value(v) => Ok(v.original.clone()),
            SymbolData::Formula(f) if f.is_function() => Err(Error::InvalidCall(format!(
                "'{}' is a function and has no value of its own",
                entry.display_name
            ))),
            SymbolData::Formula(f) => match (&f.result, &f.error) {
                (Some(q), _) => Ok(q.clone()),
                (None, Some(err)) => Err(err.clone()),
                (None, None) => Err(Error::NonFinite),
            },
            SymbolData::Parameter { .. } => Err(Error::InvalidCall(format!(
                "'{}' is a function parameter",
                entry.display_name
            ))),
        }
    }

    fn reject(&mut self, name: &str, err: Error) -> Error {
        tracing::debug!(symbol = name, kind = err.kind(), "definition rejected");
        self.symbols.mark_invalid(name, format!("{}: {}", err.kind(), err));
        err
    }

    /// Registers a definition. An `Err` after registration means the symbol
    /// was recorded but carries a problem (unresolved unit, failed formula).
    fn define(&mut self, name: &Piece<'_>, body: &Piece<'_>, line: usize) -> Result<InternalId> {
        let target = match parse_target(name.text) {
            Ok(target) => target,
            Err(err) => return Err(self.reject(name.text, err.shifted(name.offset))),
        };
        for candidate in std::iter::once(&target.name).chain(&target.params) {
            if let Err(err) = self.units.check_symbol_name(&canonical_name(candidate)) {
                return Err(self.reject(&target.name, err.into()));
            }
        }
        let expr = match self.parse_piece(body) {
            Ok(expr) => expr,
            Err(err) => return Err(self.reject(&target.name, err)),
        };

        if !target.params.is_empty() {
            self.define_function(target, expr, line)
        } else if expr.is_value_shaped() {
            self.define_value(&target.name, &expr, line)
        } else {
            self.define_formula(&target.name, expr, line)
        }
    }

    fn define_value(&mut self, name: &str, expr: &Expr, line: usize) -> Result<InternalId> {
        let (outcome, unresolved) = {
            let mut evaluator =
                Evaluator::new(&self.symbols, &self.units, &self.options).lenient();
            let outcome = evaluator.evaluate(expr);
            (outcome, evaluator.unresolved_units().first().cloned())
        };
        let original = match outcome {
            Ok(q) => q,
            Err(err) => return Err(self.reject(name, err)),
        };
        match unresolved {
            None => {
                let base = self.units.to_base(&original);
                Ok(self.symbols.register_value(
                    name,
                    line,
                    ValueRecord {
                        original,
                        base: Some(base),
                        conversion_ok: true,
                        conversion_error: None,
                    },
                ))
            }
            Some(unit) => {
                let err = Error::UnknownUnit {
                    name: unit,
                    at: None,
                };
                tracing::debug!(symbol = name, %err, "value kept with unresolved unit");
                self.symbols.register_value(
                    name,
                    line,
                    ValueRecord {
                        original,
                        base: None,
                        conversion_ok: false,
                        conversion_error: Some(err.to_string()),
                    },
                );
                Err(err)
            }
        }
    }

    /// Ids of the symbols `expr` references, skipping `locals`.
    fn dependencies(&self, expr: &Expr, locals: &[String]) -> Vec<InternalId> {
        let mut deps = Vec::new();
        let names = expr.variables().into_iter().chain(expr.calls());
        for name in names {
            if locals.iter().any(|l| l == name) {
                continue;
            }
            if let Lookup::Found(entry) = self.symbols.lookup(name) {
                if !deps.contains(&entry.internal_id) {
                    deps.push(entry.internal_id);
                }
            }
        }
        deps
    }

    fn define_formula(&mut self, name: &str, expr: Expr, line: usize) -> Result<InternalId> {
        let depends_on = self.dependencies(&expr, &[]);
        if let Some(path) = self.symbols.cycle_through(name, &depends_on) {
            return Err(self.reject(name, Error::Cycle { path }));
        }
        let outcome = Evaluator::new(&self.symbols, &self.units, &self.options).evaluate(&expr);
        let (result, error) = match outcome {
            Ok(q) => (Some(q), None),
            Err(err) => (None, Some(err)),
        };
        let id = self.symbols.register_formula(
            name,
            line,
            FormulaRecord {
                expression_summary: expr.to_string(),
                depends_on,
                parameters: Vec::new(),
                parameter_names: Vec::new(),
                body: expr,
                result,
                error: error.clone(),
            },
        );
        match error {
            Some(err) => Err(err),
            None => Ok(id),
        }
    }

    /// Function bodies are evaluated at call time; references are checked now.
    fn define_function(
        &mut self,
        target: DefinitionTarget,
        expr: Expr,
        line: usize,
    ) -> Result<InternalId> {
        for name in expr.variables() {
            if target.params.iter().any(|p| p == name) {
                continue;
            }
            let missing = match self.symbols.lookup(name) {
                Lookup::Found(_) => continue,
                Lookup::Invalid(reason) => Some(reason.to_string()),
                Lookup::Missing => None,
            };
            let err = Error::undefined(name, missing);
            return Err(self.reject(&target.name, err));
        }
        let depends_on = self.dependencies(&expr, &target.params);
        if let Some(path) = self.symbols.cycle_through(&target.name, &depends_on) {
            return Err(self.reject(&target.name, Error::Cycle { path }));
        }

        let parameters: Vec<InternalId> = target
            .params
            .iter()
            .map(|p| self.symbols.register_parameter(p, line))
            .collect();
        let id = self.symbols.register_formula(
            &target.name,
            line,
            FormulaRecord {
                expression_summary: expr.to_string(),
                depends_on,
                parameters: parameters.clone(),
                parameter_names: target.params,
                body: expr,
                result: None,
                error: None,
            },
        );
        self.symbols.attach_parameters(id, &parameters);
        Ok(id)
    }

    fn define_unit(&mut self, name: &Piece<'_>, body: &Piece<'_>, line: usize) -> Result<Execution> {
        if let Lookup::Found(entry) = self.symbols.lookup(name.text) {
            return Err(Error::UnitDefinition(format!(
                "'{}' is already defined as {} {}",
                name.text,
                entry.role().as_str(),
                entry.internal_id
            )));
        }
        let kind = self
            .units
            .define_custom_unit(name.text, body.text, Some(line))
            .map_err(|err| match err {
                calcmark_units::Error::Empty | calcmark_units::Error::Syntax { .. } => {
                    Error::UnitDefinition(format!("invalid definition of '{}': {}", name.text, err))
                }
                other => other.into(),
            })?;
        Ok(Execution::UnitDefined {
            name: name.text.to_string(),
            kind,
        })
    }
}

/// Parses `name` or `name(p1, p2, ...)` in definition mode.
fn parse_target(text: &str) -> Result<DefinitionTarget> {
    let tokens = tokenize(text, LexMode::Definition)?;
    let mut iter = tokens.iter().peekable();
    let invalid = |start: usize, end: usize| {
        Error::parse(
            "left side of ':=' must be a name or a function signature f(x, ...)",
            start,
            end,
        )
    };

    let name = match iter.next() {
        Some(t) if t.kind == TokenKind::Identifier => t.text.clone(),
        Some(t) => return Err(invalid(t.start, t.end)),
        None => return Err(invalid(0, text.len())),
    };
    let mut params = Vec::new();
    if iter.peek().is_some_and(|t| t.kind == TokenKind::LParen) {
        iter.next();
        loop {
            match iter.next() {
                Some(t) if t.kind == TokenKind::Identifier => {
                    if params.contains(&t.text) {
                        return Err(Error::parse(
                            format!("parameter '{}' is declared twice", t.text),
                            t.start,
                            t.end,
                        ));
                    }
                    params.push(t.text.clone());
                }
                Some(t) => return Err(invalid(t.start, t.end)),
                None => return Err(invalid(0, text.len())),
            }
            match iter.next() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::RParen => break,
                Some(t) => return Err(invalid(t.start, t.end)),
                None => return Err(invalid(0, text.len())),
            }
        }
    }
    match iter.next() {
        Some(t) if t.kind == TokenKind::Eof => Ok(DefinitionTarget { name, params }),
        Some(t) => Err(invalid(t.start, t.end)),
        None => Ok(DefinitionTarget { name, params }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &mut Engine, content: &str) -> Result<Execution> {
        let statement = Statement::split(content).expect("statement");
        engine.execute(&statement, 1)
    }

    #[test]
    fn definition_targets() {
        assert_eq!(
            parse_target("f(x, y)").unwrap(),
            DefinitionTarget {
                name: "f".into(),
                params: vec!["x".into(), "y".into()]
            }
        );
        assert_eq!(parse_target("R^2").unwrap().name, "R^2");
        assert!(parse_target("a + b").is_err());
        assert!(parse_target("f(x, x)").is_err());
    }

    #[test]
    fn classification_follows_ast_shape() {
        let mut engine = Engine::default();
        let Execution::Defined { id } = run(&mut engine, "a := 2.5 [m] * 3").unwrap() else {
            panic!("expected definition");
        };
        assert_eq!(id.to_string(), "value-1");
        let Execution::Defined { id } = run(&mut engine, "b := 2 * a").unwrap() else {
            panic!("expected definition");
        };
        assert_eq!(id.to_string(), "formula-1");
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut engine = Engine::default();
        run(&mut engine, "x := 1").unwrap();
        let err = run(&mut engine, "x := x + 1").unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
        assert!(matches!(
            engine.evaluate("x"),
            Err(Error::UndefinedSymbol { reason: Some(_), .. })
        ));
    }

    #[test]
    fn user_functions_bind_positionally() {
        let mut engine = Engine::default();
        run(&mut engine, "g := 9.81 [m/s^2]").unwrap();
        run(&mut engine, "E(m, h_0) := m * g * h_0").unwrap();
        let q = engine.evaluate("E(2 [kg], 10 [m])").unwrap();
        assert!((q.magnitude - 196.2).abs() < 1e-9);
        assert_eq!(q.unit_label(), "J");
        assert!(matches!(engine.evaluate("E(1)"), Err(Error::InvalidCall(_))));
        assert!(matches!(engine.evaluate("E"), Err(Error::InvalidCall(_))));
    }

    #[test]
    fn unit_definitions_reject_symbol_names() {
        let mut engine = Engine::default();
        run(&mut engine, "k_1 := 4").unwrap();
        assert!(matches!(
            run(&mut engine, "k_1 === 1000 W"),
            Err(Error::UnitDefinition(_))
        ));
        assert_eq!(
            run(&mut engine, "EUR === EUR").unwrap(),
            Execution::UnitDefined {
                name: "EUR".into(),
                kind: UnitKind::Base
            }
        );
    }
}
