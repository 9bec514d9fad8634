//! Pluggable backend for `=>` regions
//!
//! The engine only checks that a symbolic region parses. Rendering the
//! symbolic form (substitution, simplification, highlighting) is left to
//! an implementation of [`SymbolicBackend`] supplied by the caller.

use crate::ast::Expr;
use crate::error::Result;
use crate::statement::sanitize;
use crate::symbols::SymbolTable;

/// Renders the output of a `=>` region.
///
/// # Example
///
/// ```rust,ignore
/// use calcmark_engine::{Expr, Result, SymbolTable, SymbolicBackend};
///
/// struct Echo;
///
/// impl SymbolicBackend for Echo {
///     fn render(&self, expr: &Expr, _symbols: &SymbolTable) -> Result<Option<String>> {
///         Ok(Some(expr.to_string()))
///     }
/// }
/// ```
pub trait SymbolicBackend: Send + Sync {
    /// Returns the text written after `=>`, or `None` to leave the slot empty.
    ///
    /// `symbols` holds every definition that precedes the region.
    fn render(&self, expr: &Expr, symbols: &SymbolTable) -> Result<Option<String>>;
}

/// Writes the plain-text summary of the parsed expression.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryBackend;

impl SymbolicBackend for SummaryBackend {
    fn render(&self, expr: &Expr, _symbols: &SymbolTable) -> Result<Option<String>> {
        Ok(Some(format!("\\text{{{}}}", sanitize(&expr.to_string()))))
    }
}
