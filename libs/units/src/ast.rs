use num_rational::Rational32;

/// Syntax tree of a written unit expression such as `kg*m/s^2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitSyntax {
    pub numerator: Vec<(Term, Rational32)>,
    pub denominator: Vec<(Term, Rational32)>,
}

impl UnitSyntax {
    pub fn one() -> Self {
        Self {
            numerator: vec![],
            denominator: vec![],
        }
    }

    /// Whether the expression is a single bare symbol (`bar`, not `bar^2` or `1/bar`).
    pub fn as_single_symbol(&self) -> Option<&str> {
        match (self.numerator.as_slice(), self.denominator.is_empty()) {
            ([(Term::Atom(Atom::Symbol(s)), e)], true) if *e == Rational32::from_integer(1) => {
                Some(s.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Atom(Atom),
    Group(Box<UnitSyntax>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Atom {
    /// A unit symbol, possibly prefixed (e.g. `km`, `Ω`, `EUR`).
    Symbol(String),
    /// A positive integer scalar (e.g. the `1` in `1/s`).
    Integer(u64),
}
