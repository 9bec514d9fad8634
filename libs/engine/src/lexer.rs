//! Expression lexer - tokenizes the text of one math statement
//!
//! Handles plain ASCII operators, the LaTeX commands people actually type in
//! math regions (`\cdot`, `\frac`, `\sqrt`, Greek letters, spacing), and unit
//! attachments. Offsets are byte offsets into the input.
//!
//! Identifiers keep subscripts as part of the name in both modes. Superscripts
//! are part of the name only in [`LexMode::Definition`], so that `R^2 := ...`
//! defines a symbol called `R^2` while `x^2` in an evaluated expression is a
//! power.

use crate::error::{Error, Result};
use crate::functions;
use crate::token::{Token, TokenKind};

/// Which side of a statement is being tokenized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// The name on the left of `:=`
    Definition,
    /// Anything that will be evaluated
    Evaluation,
}

/// Commands that only affect layout
const LAYOUT_COMMANDS: &[&str] = &[
    "quad",
    "qquad",
    "left",
    "right",
    "displaystyle",
    "big",
    "Big",
    "bigl",
    "bigr",
    "Bigl",
    "Bigr",
];

const GREEK: &[(&str, char)] = &[
    ("alpha", 'α'),
    ("beta", 'β'),
    ("gamma", 'γ'),
    ("delta", 'δ'),
    ("epsilon", 'ϵ'),
    ("varepsilon", 'ε'),
    ("zeta", 'ζ'),
    ("eta", 'η'),
    ("theta", 'θ'),
    ("vartheta", 'ϑ'),
    ("iota", 'ι'),
    ("kappa", 'κ'),
    ("lambda", 'λ'),
    ("mu", 'μ'),
    ("nu", 'ν'),
    ("xi", 'ξ'),
    ("rho", 'ρ'),
    ("varrho", 'ϱ'),
    ("sigma", 'σ'),
    ("tau", 'τ'),
    ("upsilon", 'υ'),
    ("phi", 'ϕ'),
    ("varphi", 'φ'),
    ("chi", 'χ'),
    ("psi", 'ψ'),
    ("omega", 'ω'),
    ("Gamma", 'Γ'),
    ("Delta", 'Δ'),
    ("Theta", 'Θ'),
    ("Lambda", 'Λ'),
    ("Xi", 'Ξ'),
    ("Pi", 'Π'),
    ("Sigma", 'Σ'),
    ("Upsilon", 'Υ'),
    ("Phi", 'Φ'),
    ("Psi", 'Ψ'),
    ("Omega", 'Ω'),
];

fn greek_letter(name: &str) -> Option<char> {
    GREEK.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() && c != 'π'
}

/// The expression lexer
pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
    mode: LexMode,
    last: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, mode: LexMode) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            idx: 0,
            mode,
            last: None,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.idx + n).map(|(_, c)| *c)
    }

    fn pos(&self) -> usize {
        self.chars
            .get(self.idx)
            .map(|(i, _)| *i)
            .unwrap_or(self.src.len())
    }

    fn bump(&mut self) {
        self.idx += 1;
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> Error {
        Error::Tokenize {
            message: message.into(),
            offset,
        }
    }

    /// Name of the `\command` starting at the current position and the index
    /// just past it. Non-letter commands (`\,`) are one character long.
    fn command_at(&self) -> Option<(String, usize)> {
        if self.peek() != Some('\\') {
            return None;
        }
        let first = self.peek_at(1)?;
        if !first.is_ascii_alphabetic() {
            return Some((first.to_string(), self.idx + 2));
        }
        let mut end = self.idx + 1;
        let mut name = String::new();
        while let Some((_, c)) = self.chars.get(end) {
            if !c.is_ascii_alphabetic() {
                break;
            }
            name.push(*c);
            end += 1;
        }
        Some((name, end))
    }

    /// Skips whitespace, alignment marks and layout commands.
    fn skip_layout(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '~' || c == '&' => self.bump(),
                Some('\\') => match self.command_at() {
                    Some((name, next))
                        if matches!(name.as_str(), "," | ";" | "!" | ":" | " " | "\\")
                            || LAYOUT_COMMANDS.contains(&name.as_str()) =>
                    {
                        self.idx = next;
                    }
                    _ => return,
                },
                _ => return,
            }
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_layout();
        let token = self.scan()?;
        self.last = Some(token.kind);
        Ok(token)
    }

    /// Tokenizes the whole input; the last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn single(&mut self, kind: TokenKind, width: usize) -> Token {
        let start = self.pos();
        self.idx += width;
        let end = self.pos();
        Token::new(kind, &self.src[start..end], start, end)
    }

    fn scan(&mut self) -> Result<Token> {
        let start = self.pos();
        let Some(c) = self.peek() else {
            return Ok(Token::eof(self.src.len()));
        };

        let token = match c {
            '+' => self.single(TokenKind::Plus, 1),
            '-' | '−' => self.single(TokenKind::Minus, 1),
            '*' | '·' | '×' | '⋅' => self.single(TokenKind::Star, 1),
            '/' | '÷' => self.single(TokenKind::Slash, 1),
            '^' => self.single(TokenKind::Caret, 1),
            '{' => self.single(TokenKind::LBrace, 1),
            '}' => self.single(TokenKind::RBrace, 1),
            '(' => self.single(TokenKind::LParen, 1),
            ')' => self.single(TokenKind::RParen, 1),
            ',' => self.single(TokenKind::Comma, 1),
            ':' if self.peek_at(1) == Some('=') => self.single(TokenKind::Define, 2),
            ':' => return Err(self.error("expected '=' after ':'", start)),
            '=' => match (self.peek_at(1), self.peek_at(2)) {
                (Some('='), Some('=')) => self.single(TokenKind::UnitDefine, 3),
                (Some('='), _) => self.single(TokenKind::Evaluate, 2),
                (Some('>'), _) => self.single(TokenKind::Symbolic, 2),
                _ => self.single(TokenKind::Equals, 1),
            },
            '[' => self.read_bracket_unit()?,
            'π' => self.single(TokenKind::Number, 1),
            c if c.is_ascii_digit() => self.read_number(),
            '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.read_number(),
            '\\' => self.read_command()?,
            c if c.is_alphabetic() => {
                while self.peek().is_some_and(is_name_char) {
                    self.bump();
                }
                while self.peek() == Some('\'') {
                    self.bump();
                }
                self.read_name_suffix()?;
                let end = self.pos();
                Token::new(TokenKind::Identifier, &self.src[start..end], start, end)
            }
            other => {
                return Err(self.error(format!("unexpected character '{}'", other), start));
            }
        };
        Ok(token)
    }

    /// `[kg*m/s^2]`
    fn read_bracket_unit(&mut self) -> Result<Token> {
        let start = self.pos();
        self.bump();
        let inner_start = self.pos();
        while let Some(c) = self.peek() {
            if c == ']' {
                let inner = self.src[inner_start..self.pos()].trim().to_string();
                self.bump();
                if inner.is_empty() {
                    return Err(self.error("empty unit brackets", start));
                }
                return Ok(Token::new(TokenKind::UnitAttach, inner, start, self.pos()));
            }
            if c == '[' || c == '\n' {
                break;
            }
            self.bump();
        }
        Err(self.error("unterminated unit bracket", start))
    }

    /// Integer, decimal and exponent forms: `5`, `9.81`, `.5`, `1e-3`, `6.02E23`.
    fn read_number(&mut self) -> Token {
        let start = self.pos();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let digits_at = if matches!(self.peek_at(1), Some('+' | '-')) {
                2
            } else {
                1
            };
            if self.peek_at(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                self.idx += digits_at;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let end = self.pos();
        Token::new(TokenKind::Number, &self.src[start..end], start, end)
    }

    /// Reads `{...}` with balanced nesting; returns the inner text.
    fn read_braced(&mut self) -> Result<&'a str> {
        let open = self.pos();
        if self.peek() != Some('{') {
            return Err(self.error("expected '{'", open));
        }
        self.bump();
        let inner_start = self.pos();
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let src = self.src;
                        let inner = &src[inner_start..self.pos()];
                        self.bump();
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.bump();
        }
        Err(self.error("unbalanced '{'", open))
    }

    /// Subscripts (always) and superscripts (definition mode only) that
    /// belong to the identifier just read.
    fn read_name_suffix(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some('_') => {}
                Some('^') if self.mode == LexMode::Definition => {}
                _ => return Ok(()),
            }
            let marker = self.pos();
            self.bump();
            match self.peek() {
                Some('{') => {
                    self.read_braced()?;
                }
                Some(c) if c.is_alphanumeric() => self.bump(),
                Some('\\') => match self.command_at() {
                    Some((name, next)) if greek_letter(&name).is_some() => self.idx = next,
                    _ => return Err(self.error("invalid subscript or superscript", marker)),
                },
                _ => return Err(self.error("missing subscript or superscript", marker)),
            }
        }
    }

    fn read_command(&mut self) -> Result<Token> {
        let start = self.pos();
        let Some((name, next)) = self.command_at() else {
            return Err(self.error("dangling '\\'", start));
        };
        self.idx = next;

        let kind = match name.as_str() {
            "cdot" | "times" | "ast" => TokenKind::Star,
            "div" => TokenKind::Slash,
            "frac" | "dfrac" | "tfrac" => TokenKind::Frac,
            "pi" => TokenKind::Number,
            "{" => TokenKind::LBrace,
            "}" => TokenKind::RBrace,
            "%" => {
                return Ok(Token::new(TokenKind::UnitAttach, "%", start, self.pos()));
            }
            "sqrt" => {
                let mut index = String::new();
                if self.peek() == Some('[') {
                    self.bump();
                    let index_start = self.pos();
                    while self.peek().is_some_and(|c| c != ']') {
                        self.bump();
                    }
                    if self.peek() != Some(']') {
                        return Err(self.error("unterminated root index", start));
                    }
                    index = self.src[index_start..self.pos()].trim().to_string();
                    self.bump();
                }
                return Ok(Token::new(TokenKind::Sqrt, index, start, self.pos()));
            }
            "text" | "mathrm" => {
                let inner = self.read_braced()?;
                let after_value = matches!(
                    self.last,
                    Some(TokenKind::Number | TokenKind::RParen | TokenKind::RBrace)
                );
                if self.mode == LexMode::Evaluation && after_value {
                    let unit = inner.trim();
                    if unit.is_empty() {
                        return Err(self.error("empty unit", start));
                    }
                    return Ok(Token::new(TokenKind::UnitAttach, unit, start, self.pos()));
                }
                self.read_name_suffix()?;
                TokenKind::Identifier
            }
            "operatorname" => {
                let inner = self.read_braced()?.trim().to_string();
                return Ok(Token::new(TokenKind::Identifier, inner, start, self.pos()));
            }
            other => {
                if let Some(letter) = greek_letter(other) {
                    let suffix_start = self.pos();
                    self.read_name_suffix()?;
                    let mut text = letter.to_string();
                    text.push_str(&self.src[suffix_start..self.pos()]);
                    return Ok(Token::new(TokenKind::Identifier, text, start, self.pos()));
                }
                if functions::is_builtin(other) {
                    return Ok(Token::new(TokenKind::Identifier, other, start, self.pos()));
                }
                return Err(self.error(format!("unknown command '\\{}'", other), start));
            }
        };
        let end = self.pos();
        Ok(Token::new(kind, &self.src[start..end], start, end))
    }
}

/// Tokenizes `src` in the given mode.
pub fn tokenize(src: &str, mode: LexMode) -> Result<Vec<Token>> {
    Lexer::new(src, mode).tokenize()
}
