//! Expression parser - converts tokens to an AST
//!
//! Recursive descent. Precedence (lowest to highest):
//! 1. additive (+, -)
//! 2. multiplicative (*, /, implicit juxtaposition)
//! 3. power (^, right-associative)
//! 4. polarity (unary -, folded into numeric literals)
//! 5. term (literal, identifier, call, group, \frac, \sqrt)
//!
//! Unit attachments are accepted only directly after a numeric literal or a
//! closing paren/brace, and attach to the whole power they follow
//! (`10^{3} [m]` is `(10^3) [m]`). The base of such a power must itself be a
//! literal or a bracketed group, so `x^2 [m]` is rejected.
//!
//! Every operand of a `+`/`-` or `*`/`/` chain counts toward the depth limit
//! like a nesting level: the chain becomes a left-nested tree of that depth.

use crate::ast::{BinaryOp, Expr, Span, UnaryOp};
use crate::error::{Error, Result};
use crate::functions;
use crate::lexer::{tokenize, LexMode};
use crate::token::{Token, TokenKind};
use std::collections::HashSet;

pub const MAX_RECURSION_DEPTH: usize = 200;

/// Parser for expression tokens
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    user_functions: Option<&'a HashSet<String>>,
    recursion_depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an `Eof` token, as produced by the lexer.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.end);
            tokens.push(Token::eof(end));
        }
        Self {
            tokens,
            pos: 0,
            user_functions: None,
            recursion_depth: 0,
            max_depth: MAX_RECURSION_DEPTH,
        }
    }

    /// Names of user functions that may be called in addition to the builtins.
    pub fn with_user_functions(mut self, names: &'a HashSet<String>) -> Self {
        self.user_functions = Some(names);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> Error {
        Error::parse(message, token.start, token.end)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.current_is(kind) {
            Ok(self.advance())
        } else {
            let token = self.current();
            Err(self.error_at(token, format!("expected {}, found {}", what, describe(token))))
        }
    }

    /// Parse the entire token stream as one expression.
    pub fn parse(&mut self) -> Result<Expr> {
        if self.current_is(TokenKind::Eof) {
            return Err(self.error_at(self.current(), "expected an expression"));
        }
        let expr = self.parse_expression()?;
        if !self.current_is(TokenKind::Eof) {
            let token = self.current();
            return Err(self.error_at(token, format!("unexpected {}", describe(token))));
        }
        Ok(expr)
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > self.max_depth {
            let token = self.current();
            return Err(self.error_at(
                token,
                format!("expression too deeply nested (max depth: {})", self.max_depth),
            ));
        }
        Ok(())
    }

    fn decrement_recursion_depth(&mut self) {
        self.recursion_depth -= 1;
    }

    fn span_of(token: &Token) -> Span {
        Span::new(token.start, token.end)
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.check_recursion_depth()?;
        let expr = self.parse_additive_expression();
        self.decrement_recursion_depth();
        expr
    }

    fn parse_additive_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expression()?;
        let mut chained = 0;
        let result = loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break Ok(left),
            };
            self.check_recursion_depth()?;
            chained += 1;
            let span = Self::span_of(&self.advance());
            let right = self.parse_multiplicative_expression()?;
            left = Expr::binary(op, left, right, span);
        };
        self.recursion_depth -= chained;
        result
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_power_expression()?;
        let mut chained = 0;
        let result = loop {
            let span = Self::span_of(self.current());
            let op = match self.current().kind {
                TokenKind::Star => {
                    self.advance();
                    BinaryOp::Mul
                }
                TokenKind::Slash => {
                    self.advance();
                    BinaryOp::Div
                }
                _ if self.starts_implicit_operand() => BinaryOp::Mul,
                TokenKind::Number => {
                    break Err(self.error_at(
                        self.current(),
                        "a number cannot directly follow another value; write '*' explicitly",
                    ));
                }
                _ => break Ok(left),
            };
            self.check_recursion_depth()?;
            chained += 1;
            let right = self.parse_power_expression()?;
            left = Expr::binary(op, left, right, span);
        };
        self.recursion_depth -= chained;
        result
    }

    /// Juxtaposition (`2x`, `2\pi r`, `(a+b)(c+d)`) multiplies, except before
    /// a digit literal.
    fn starts_implicit_operand(&self) -> bool {
        let token = self.current();
        match token.kind {
            TokenKind::Identifier
            | TokenKind::LParen
            | TokenKind::LBrace
            | TokenKind::Frac
            | TokenKind::Sqrt => true,
            TokenKind::Number => !token.is_digit_literal(),
            _ => false,
        }
    }

    /// A power chain, then an optional unit attachment wrapping all of it.
    fn parse_power_expression(&mut self) -> Result<Expr> {
        let expr = self.parse_power_chain()?;
        self.parse_unit_attachment(expr)
    }

    fn parse_power_chain(&mut self) -> Result<Expr> {
        self.check_recursion_depth()?;
        let result = self.parse_power_inner();
        self.decrement_recursion_depth();
        result
    }

    fn parse_power_inner(&mut self) -> Result<Expr> {
        let base = self.parse_polarity_expression()?;
        if !self.current_is(TokenKind::Caret) {
            return Ok(base);
        }
        let span = Self::span_of(&self.advance());
        let exponent = self.parse_power_chain()?;
        Ok(Expr::binary(BinaryOp::Pow, base, exponent, span))
    }

    fn parse_unit_attachment(&mut self, expr: Expr) -> Result<Expr> {
        if !self.current_is(TokenKind::UnitAttach) {
            return Ok(expr);
        }
        let after_value = matches!(
            self.previous().map(|t| t.kind),
            Some(TokenKind::Number | TokenKind::RParen | TokenKind::RBrace)
        );
        let attaches = after_value
            && match &expr {
                Expr::Binary {
                    op: BinaryOp::Pow,
                    left,
                    ..
                } => matches!(**left, Expr::Number(_) | Expr::Group(_)),
                _ => true,
            };
        let token = self.advance();
        if !attaches {
            return Err(self.error_at(
                &token,
                format!(
                    "unit [{}] must follow a number or a closing bracket",
                    token.text
                ),
            ));
        }
        Ok(Expr::UnitAttach {
            expr: Box::new(expr),
            span: Self::span_of(&token),
            unit: token.text,
        })
    }

    /// Unary minus binds tighter than power; `-` before a numeric literal is
    /// folded into the literal.
    fn parse_polarity_expression(&mut self) -> Result<Expr> {
        match self.current().kind {
            TokenKind::Minus => {
                self.advance();
                if self.current_is(TokenKind::Number) {
                    let token = self.advance();
                    return Ok(Expr::Number(-number_value(&token)?));
                }
                self.check_recursion_depth()?;
                let operand = self.parse_polarity_expression();
                self.decrement_recursion_depth();
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand?),
                })
            }
            TokenKind::Plus => {
                self.advance();
                self.check_recursion_depth()?;
                let operand = self.parse_polarity_expression();
                self.decrement_recursion_depth();
                operand
            }
            _ => self.parse_term(),
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::Number(number_value(&token)?))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.current_is(TokenKind::LParen) || self.opens_braced_call(&token.text) {
                    return self.parse_call(token);
                }
                let span = Self::span_of(&token);
                Ok(Expr::variable(token.text, span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::LBrace => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RBrace, "'}'")?;
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::Frac => {
                self.advance();
                let numerator = self.parse_braced_argument()?;
                let denominator = self.parse_braced_argument()?;
                Ok(Expr::Fraction {
                    numerator: Box::new(numerator),
                    denominator: Box::new(denominator),
                    span: Self::span_of(&token),
                })
            }
            TokenKind::Sqrt => {
                self.advance();
                let index = if token.text.is_empty() {
                    2.0
                } else {
                    token.text.parse::<f64>().map_err(|_| {
                        self.error_at(&token, format!("root index '{}' must be a number", token.text))
                    })?
                };
                let radicand = self.parse_braced_argument()?;
                Ok(root(radicand, index, Self::span_of(&token)))
            }
            TokenKind::UnitAttach => Err(self.error_at(
                &token,
                format!(
                    "unit [{}] must follow a number or a closing bracket",
                    token.text
                ),
            )),
            TokenKind::Eof => Err(self.error_at(&token, "unexpected end of expression")),
            _ => Err(self.error_at(&token, format!("unexpected {}", describe(&token)))),
        }
    }

    /// `\sin{x}` style calls for builtins.
    fn opens_braced_call(&self, name: &str) -> bool {
        self.current_is(TokenKind::LBrace) && functions::is_builtin(name)
    }

    fn parse_braced_argument(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let inner = self.parse_expression()?;
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(inner)
    }

    fn is_callable(&self, name: &str) -> bool {
        functions::is_builtin(name) || self.user_functions.is_some_and(|set| set.contains(name))
    }

    fn parse_call(&mut self, name_token: Token) -> Result<Expr> {
        if !self.is_callable(&name_token.text) {
            return Err(self.error_at(
                &name_token,
                format!("'{}' is not a known function", name_token.text),
            ));
        }
        let close = if self.current_is(TokenKind::LBrace) {
            TokenKind::RBrace
        } else {
            TokenKind::RParen
        };
        self.advance();

        let mut args = Vec::new();
        if !self.current_is(close) {
            loop {
                args.push(self.parse_expression()?);
                if self.current_is(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(close, if close == TokenKind::RParen { "')'" } else { "'}'" })?;

        let name_span = Self::span_of(&name_token);
        let (name_start, name_end) = (name_token.start, name_token.end);
        let name = name_token.text;
        if name == "sqrt" {
            return match <[Expr; 1]>::try_from(args) {
                Ok([radicand]) => Ok(root(radicand, 2.0, name_span)),
                Err(args) => Err(Error::parse(
                    format!("sqrt takes 1 argument, got {}", args.len()),
                    name_start,
                    name_end,
                )),
            };
        }
        Ok(Expr::Call { name, args })
    }
}

/// `\sqrt[n]{x}` is `x^(1/n)`.
fn root(radicand: Expr, index: f64, span: Span) -> Expr {
    Expr::binary(
        BinaryOp::Pow,
        Expr::Group(Box::new(radicand)),
        Expr::Fraction {
            numerator: Box::new(Expr::Number(1.0)),
            denominator: Box::new(Expr::Number(index)),
            span,
        },
        span,
    )
}

fn number_value(token: &Token) -> Result<f64> {
    if token.text == "\\pi" || token.text == "π" {
        return Ok(std::f64::consts::PI);
    }
    token
        .text
        .parse::<f64>()
        .map_err(|_| Error::parse(format!("invalid number '{}'", token.text), token.start, token.end))
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of expression".to_string(),
        TokenKind::UnitAttach => format!("unit [{}]", token.text),
        _ => format!("'{}'", token.text),
    }
}

/// Tokenizes and parses `text` as an evaluated expression.
pub fn parse_expression(text: &str, user_functions: &HashSet<String>, max_depth: usize) -> Result<Expr> {
    let tokens = tokenize(text, LexMode::Evaluation)?;
    Parser::new(tokens)
        .with_user_functions(user_functions)
        .with_max_depth(max_depth)
        .parse()
}
