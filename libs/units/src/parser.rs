//! Parser for written unit expressions (the text inside `[...]`).
//!
//! Grammar:
//!
//! ```text
//! expr     := term (('*' | '.' | '·' | '×' | ws) term | '/' term)*
//! term     := factor exponent?
//! factor   := symbol | integer | '(' expr ')'
//! exponent := '^' ratio | '^{' ratio '}' | '^(' ratio ')' | '²' | '³'
//! ratio    := '-'? digits ('/' digits)?
//! ```
//!
//! Division binds only the term that follows it: `J/kg/K` is `J·kg⁻¹·K⁻¹`.

use crate::ast::{Atom, Term, UnitSyntax};
use crate::error::{Error, Result};
use num_rational::Rational32;

const MAX_DEPTH: usize = 32;

pub fn parse(input: &str) -> Result<UnitSyntax> {
    if input.trim().is_empty() {
        return Err(Error::Empty);
    }
    let mut p = UnitParser::new(input);
    p.skip_ws();
    let expr = p.parse_expr(0)?;
    p.skip_ws();
    if !p.at_end() {
        return Err(syntax(p.pos(), "unexpected character"));
    }
    Ok(expr)
}

pub fn validate(input: &str) -> Result<()> {
    parse(input).map(|_| ())
}

pub(crate) fn is_symbol_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '°' | '%' | '‰' | '€' | '£' | '¥')
}

fn syntax(pos: usize, message: &'static str) -> Error {
    Error::Syntax { pos, message }
}

struct UnitParser<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
}

impl<'a> UnitParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            idx: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).map(|(_, c)| *c)
    }

    fn pos(&self) -> usize {
        self.chars
            .get(self.idx)
            .map(|(i, _)| *i)
            .unwrap_or(self.src.len())
    }

    fn at_end(&self) -> bool {
        self.idx >= self.chars.len()
    }

    fn bump(&mut self) {
        self.idx += 1;
    }

    /// Skips whitespace; returns whether anything was skipped.
    fn skip_ws(&mut self) -> bool {
        let start = self.idx;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.idx > start
    }

    fn expect(&mut self, c: char, message: &'static str) -> Result<()> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(syntax(self.pos(), message))
        }
    }

    fn parse_expr(&mut self, depth: usize) -> Result<UnitSyntax> {
        let mut out = UnitSyntax::one();
        out.numerator.push(self.parse_term(depth)?);

        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                Some('*' | '.' | '·' | '×' | '⋅') => {
                    self.bump();
                    self.skip_ws();
                    out.numerator.push(self.parse_term(depth)?);
                }
                Some('/') => {
                    self.bump();
                    self.skip_ws();
                    out.denominator.push(self.parse_term(depth)?);
                }
                Some(c) if had_ws && (is_symbol_char(c) || c == '(') => {
                    out.numerator.push(self.parse_term(depth)?);
                }
                _ => break,
            }
        }

        Ok(out)
    }

    fn parse_term(&mut self, depth: usize) -> Result<(Term, Rational32)> {
        let start = self.pos();
        let term = match self.peek() {
            Some('(') => {
                if depth >= MAX_DEPTH {
                    return Err(syntax(start, "unit expression nested too deeply"));
                }
                self.bump();
                self.skip_ws();
                let inner = self.parse_expr(depth + 1)?;
                self.skip_ws();
                self.expect(')', "expected ')'")?;
                Term::Group(Box::new(inner))
            }
            Some(c) if c.is_ascii_digit() => Term::Atom(Atom::Integer(self.read_integer()?)),
            Some(c) if is_symbol_char(c) => {
                let begin = self.pos();
                while self.peek().is_some_and(is_symbol_char) {
                    self.bump();
                }
                Term::Atom(Atom::Symbol(self.src[begin..self.pos()].to_string()))
            }
            Some(_) => return Err(syntax(start, "expected a unit symbol")),
            None => return Err(syntax(start, "unexpected end of unit expression")),
        };
        let exponent = self.parse_exponent()?;
        Ok((term, exponent))
    }

    fn read_integer(&mut self) -> Result<u64> {
        let begin = self.pos();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.src[begin..self.pos()]
            .parse::<u64>()
            .map_err(|_| Error::Overflow)
    }

    fn parse_exponent(&mut self) -> Result<Rational32> {
        match self.peek() {
            Some('¹') => {
                self.bump();
                Ok(Rational32::from_integer(1))
            }
            Some('²') => {
                self.bump();
                Ok(Rational32::from_integer(2))
            }
            Some('³') => {
                self.bump();
                Ok(Rational32::from_integer(3))
            }
            Some('^') => {
                self.bump();
                match self.peek() {
                    Some('{') => {
                        self.bump();
                        let r = self.read_ratio()?;
                        self.expect('}', "expected '}' after exponent")?;
                        Ok(r)
                    }
                    Some('(') => {
                        self.bump();
                        let r = self.read_ratio()?;
                        self.expect(')', "expected ')' after exponent")?;
                        Ok(r)
                    }
                    _ => self.read_ratio(),
                }
            }
            _ => Ok(Rational32::from_integer(1)),
        }
    }

    fn read_ratio(&mut self) -> Result<Rational32> {
        let negative = if self.peek() == Some('-') {
            self.bump();
            true
        } else {
            false
        };
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(syntax(self.pos(), "expected an integer exponent"));
        }
        let numer = i32::try_from(self.read_integer()?).map_err(|_| Error::Overflow)?;
        let denom = if self.peek() == Some('/') {
            self.bump();
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(syntax(self.pos(), "expected an exponent denominator"));
            }
            i32::try_from(self.read_integer()?).map_err(|_| Error::Overflow)?
        } else {
            1
        };
        if denom == 0 {
            return Err(syntax(self.pos(), "exponent denominator must not be zero"));
        }
        let r = Rational32::new(numer, denom);
        Ok(if negative { -r } else { r })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Term {
        Term::Atom(Atom::Symbol(s.into()))
    }

    #[test]
    fn parses_products_and_quotients() {
        let u = parse("kg*m/s^2").unwrap();
        assert_eq!(
            u.numerator,
            vec![
                (sym("kg"), Rational32::from_integer(1)),
                (sym("m"), Rational32::from_integer(1))
            ]
        );
        assert_eq!(u.denominator, vec![(sym("s"), Rational32::from_integer(2))]);
    }

    #[test]
    fn parses_groups_and_braced_exponents() {
        let u = parse("W/(m^{2}·K)").unwrap();
        assert_eq!(u.denominator.len(), 1);
        assert!(matches!(u.denominator[0].0, Term::Group(_)));
    }

    #[test]
    fn whitespace_is_multiplication() {
        let u = parse("N m").unwrap();
        assert_eq!(u.numerator.len(), 2);
    }

    #[test]
    fn rational_and_unicode_exponents() {
        let u = parse("m^(1/2)").unwrap();
        assert_eq!(u.numerator[0].1, Rational32::new(1, 2));
        let u = parse("m²").unwrap();
        assert_eq!(u.numerator[0].1, Rational32::from_integer(2));
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(parse(""), Err(Error::Empty)));
        assert!(parse("kg/(m*s").is_err());
        assert!(parse("m//s").is_err());
        assert!(parse("m^").is_err());
        assert!(parse("m^(1/0)").is_err());
        assert!(parse("m)").is_err());
    }
}
