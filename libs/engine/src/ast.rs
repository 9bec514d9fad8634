//! Expression AST
//!
//! Built once per statement and discarded after evaluation; only the result
//! and the [`Display`](std::fmt::Display) summary are kept for the IR.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Byte range of a node in the text it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    fn shift(&mut self, by: usize) {
        self.start += by;
        self.end += by;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable {
        name: String,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        /// Position of the operator.
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Fraction {
        numerator: Box<Expr>,
        denominator: Box<Expr>,
        span: Span,
    },
    UnitAttach {
        expr: Box<Expr>,
        unit: String,
        /// Position of the bracketed unit.
        span: Span,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Group(Box<Expr>),
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: Span) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }
    }

    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Expr::Variable {
            name: name.into(),
            span,
        }
    }

    /// Where the node sits in its source, when it records one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Expr::Variable { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Fraction { span, .. }
            | Expr::UnitAttach { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Moves every recorded position by `by` bytes.
    pub fn shift_spans(&mut self, by: usize) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable { span, .. } => span.shift(by),
            Expr::Binary {
                left, right, span, ..
            } => {
                span.shift(by);
                left.shift_spans(by);
                right.shift_spans(by);
            }
            Expr::Unary { operand, .. } => operand.shift_spans(by),
            Expr::Fraction {
                numerator,
                denominator,
                span,
            } => {
                span.shift(by);
                numerator.shift_spans(by);
                denominator.shift_spans(by);
            }
            Expr::UnitAttach { expr, span, .. } => {
                span.shift(by);
                expr.shift_spans(by);
            }
            Expr::Call { args, .. } => args.iter_mut().for_each(|a| a.shift_spans(by)),
            Expr::Group(inner) => inner.shift_spans(by),
        }
    }

    /// Pure literal/unit content: a number, a unit attached to value-shaped
    /// content, a group or fraction of such, or a `*`/`/` chain of such.
    pub fn is_value_shaped(&self) -> bool {
        match self {
            Expr::Number(_) => true,
            Expr::UnitAttach { expr, .. } => expr.is_value_shaped(),
            Expr::Group(inner) => inner.is_value_shaped(),
            Expr::Unary { operand, .. } => operand.is_value_shaped(),
            Expr::Fraction {
                numerator,
                denominator,
                ..
            } => numerator.is_value_shaped() && denominator.is_value_shaped(),
            Expr::Binary {
                op: BinaryOp::Mul | BinaryOp::Div,
                left,
                right,
                ..
            } => left.is_value_shaped() && right.is_value_shaped(),
            Expr::Binary { .. } | Expr::Variable { .. } | Expr::Call { .. } => false,
        }
    }

    /// Variable names referenced, in first-occurrence order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Variable { name, .. } = e {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
        });
        out
    }

    /// Names of called functions, in first-occurrence order.
    pub fn calls(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Call { name, .. } = e {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
        });
        out
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Number(_) | Expr::Variable { .. } => {}
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Fraction {
                numerator,
                denominator,
                ..
            } => {
                numerator.walk(visit);
                denominator.walk(visit);
            }
            Expr::UnitAttach { expr, .. } => expr.walk(visit),
            Expr::Call { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            Expr::Group(inner) => inner.walk(visit),
        }
    }

    /// Nesting depth of the tree.
    pub fn depth(&self) -> usize {
        1 + match self {
            Expr::Number(_) | Expr::Variable { .. } => 0,
            Expr::Binary { left, right, .. } => left.depth().max(right.depth()),
            Expr::Unary { operand, .. } => operand.depth(),
            Expr::Fraction {
                numerator,
                denominator,
                ..
            } => numerator.depth().max(denominator.depth()),
            Expr::UnitAttach { expr, .. } => expr.depth(),
            Expr::Call { args, .. } => args.iter().map(Expr::depth).max().unwrap_or(0),
            Expr::Group(inner) => inner.depth(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Fraction { .. } => BinaryOp::Div.precedence(),
            Expr::Unary { .. } => 3,
            Expr::UnitAttach { .. } => 2,
            _ => 5,
        }
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value == std::f64::consts::PI {
        return "π".to_string();
    }
    format!("{}", value)
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if expr.precedence() < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Plain-text expression summary, e.g. `m * a` or `(x + 1) / 2`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => f.write_str(&format_number(*value)),
            Expr::Variable { name, .. } => f.write_str(name),
            Expr::Binary {
                op, left, right, ..
            } => {
                let p = op.precedence();
                if *op == BinaryOp::Pow {
                    write_operand(f, left, p + 1)?;
                    f.write_str("^")?;
                    write_operand(f, right, p)
                } else {
                    write_operand(f, left, p)?;
                    write!(f, " {} ", op.symbol())?;
                    write_operand(f, right, p + 1)
                }
            }
            Expr::Unary { operand, .. } => {
                f.write_str("-")?;
                write_operand(f, operand, 4)
            }
            Expr::Fraction {
                numerator,
                denominator,
                ..
            } => {
                write_operand(f, numerator, 2)?;
                f.write_str(" / ")?;
                write_operand(f, denominator, 3)
            }
            Expr::UnitAttach { expr, unit, .. } => {
                write_operand(f, expr, 4)?;
                write!(f, " [{}]", unit)
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Group(inner) => write!(f, "({})", inner),
        }
    }
}
