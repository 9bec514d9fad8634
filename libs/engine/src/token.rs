//! Token types for the expression lexer

/// Token kinds
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum TokenKind {
    /// Numeric literal, including `\pi` and `π`
    Number,
    Identifier,

    // Arithmetic
    Plus,  // +
    Minus, // - −
    Star,  // * \cdot \times · ×
    Slash, // / \div ÷
    Caret, // ^

    // Statement operators
    Define,     // :=
    Evaluate,   // ==
    Symbolic,   // =>
    UnitDefine, // ===
    Equals,     // =

    // Delimiters
    LBrace, // {
    RBrace, // }
    LParen, // (
    RParen, // )
    Comma,  // ,

    /// `[unit]`, `\text{unit}` or `\mathrm{unit}` after a value; text is the unit expression
    UnitAttach,
    /// `\frac`
    Frac,
    /// `\sqrt`; text holds the root index of `\sqrt[n]`, empty otherwise
    Sqrt,

    Eof,
}

impl TokenKind {
    pub fn is_statement_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Define
                | TokenKind::Evaluate
                | TokenKind::Symbolic
                | TokenKind::UnitDefine
                | TokenKind::Equals
        )
    }
}

/// A token with its byte range in the tokenized text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
        }
    }

    pub fn eof(position: usize) -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            start: position,
            end: position,
        }
    }

    /// True for digit literals; false for `\pi`/`π`.
    pub fn is_digit_literal(&self) -> bool {
        self.kind == TokenKind::Number
            && self
                .text
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || c == '.')
    }
}
