//! Calcmark expression engine
//!
//! Evaluates the statements embedded in math regions of a document, with
//! physical units tracked through every operation:
//!
//! ```text
//! Region content
//!      |
//!   Statement splitter -> authored pieces + output slot
//!      |
//!   Lexer -> Tokens
//!      |
//!   Parser -> AST
//!      |
//!   Evaluator (units from calcmark-units) -> Quantity
//!      |
//!   Symbol table -> IR document
//! ```
//!
//! One [`Engine`] serves one document pass. It owns its unit registry and
//! symbol table; nothing is global, so independent documents can be
//! processed in parallel.

#![forbid(unsafe_code)]

pub mod ast;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod statement;
pub mod symbolic;
pub mod symbols;
pub mod token;

// Re-export main types
pub use ast::{BinaryOp, Expr, Span, UnaryOp};
pub use engine::{Engine, Execution};
pub use error::{Error, Result};
pub use evaluator::{EvalOptions, Evaluator};
pub use ir::{IrDocument, IrQuantity, IrSymbol, IrUnit, IR_VERSION};
pub use lexer::{tokenize, LexMode};
pub use parser::{parse_expression, Parser, MAX_RECURSION_DEPTH};
pub use statement::{sanitize, Form, Operator, Piece, Statement, ANNOTATION_MARKER};
pub use symbolic::{SummaryBackend, SymbolicBackend};
pub use symbols::{InternalId, Lookup, Role, SymbolData, SymbolEntry, SymbolTable};
pub use token::{Token, TokenKind};

pub use calcmark_units::{CollisionPolicy, Quantity, UnitKind, UnitRegistry};
