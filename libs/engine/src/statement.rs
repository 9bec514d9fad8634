//! Statement splitter: the character-level layer of the span model.
//!
//! A math region's content is split at its statement operators (`:=`, `==`,
//! `=>`, `===`) into authored pieces, each with its byte offset inside the
//! region, and into the machine-written parts that processing may replace:
//! the output after `==`/`=>`, and an error annotation appended to regions
//! without an output operator.

use crate::error::Error;

/// Start of the annotation written after a failed statement with no output slot.
pub const ANNOTATION_MARKER: &str = " \\quad \\color{red}{\\text{Error:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Define,
    Evaluate,
    Symbolic,
    UnitDefine,
    Equals,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Define => ":=",
            Operator::Evaluate => "==",
            Operator::Symbolic => "=>",
            Operator::UnitDefine => "===",
            Operator::Equals => "=",
        }
    }

    fn len(self) -> usize {
        self.as_str().len()
    }
}

/// A trimmed slice of the region content and its byte offset there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'a> {
    pub text: &'a str,
    pub offset: usize,
}

impl<'a> Piece<'a> {
    fn of(content: &'a str, start: usize, end: usize) -> Self {
        let raw = &content[start..end];
        let leading = raw.len() - raw.trim_start().len();
        Self {
            text: raw.trim(),
            offset: start + leading,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form<'a> {
    /// `name := body`
    Define { name: Piece<'a>, body: Piece<'a> },
    /// `name := body ==`
    DefineEvaluate { name: Piece<'a>, body: Piece<'a> },
    /// `expr ==`
    Evaluate { expr: Piece<'a> },
    /// `expr =>` or `name := expr =>`
    Symbolic {
        name: Option<Piece<'a>>,
        expr: Piece<'a>,
    },
    /// `name === definition`
    UnitDefinition { name: Piece<'a>, body: Piece<'a> },
    /// Operators present but not in a valid combination.
    Invalid(Error),
}

impl Form<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Form::Define { .. } => "define",
            Form::DefineEvaluate { .. } => "define+evaluate",
            Form::Evaluate { .. } => "evaluate",
            Form::Symbolic { .. } => "symbolic",
            Form::UnitDefinition { .. } => "unit",
            Form::Invalid(_) => "invalid",
        }
    }
}

/// One statement with the layout needed to rewrite or strip it.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement<'a> {
    pub content: &'a str,
    pub form: Form<'a>,
    /// Byte offset just past `==`/`=>`, when the statement has an output slot.
    pub output_at: Option<usize>,
    /// End of the authored text: before any earlier annotation.
    pub authored_end: usize,
    /// Start of the region's trailing whitespace.
    pub trailing_start: usize,
}

impl<'a> Statement<'a> {
    /// Splits region content. Returns `None` when the content holds none of
    /// the statement operators (or only bare `=`): ordinary math.
    pub fn split(content: &'a str) -> Option<Self> {
        let trailing_start = content.trim_end().len();
        let annotation = content[..trailing_start].find(ANNOTATION_MARKER);
        let scan_end = annotation.unwrap_or(trailing_start);
        let ops = scan_operators(&content[..scan_end]);

        let output = ops
            .iter()
            .position(|(op, _)| matches!(op, Operator::Evaluate | Operator::Symbolic));
        let (authored, output_at) = match output {
            Some(i) => (&ops[..i], Some(ops[i].1 + ops[i].0.len())),
            None => (&ops[..], None),
        };
        if output.is_none() && authored.iter().all(|(op, _)| *op == Operator::Equals) {
            return None;
        }
        let authored_end = if output_at.is_some() {
            trailing_start
        } else {
            scan_end
        };

        let form = match output {
            Some(i) => classify_with_output(content, authored, ops[i]),
            None => classify_without_output(content, authored, scan_end),
        };

        Some(Self {
            content,
            form,
            output_at,
            authored_end,
            trailing_start,
        })
    }

    pub fn trailing(&self) -> &'a str {
        &self.content[self.trailing_start..]
    }

    /// Content with every machine-written part removed.
    pub fn stripped(&self) -> String {
        let head = match self.output_at {
            Some(at) => &self.content[..at],
            None => self.content[..self.authored_end].trim_end(),
        };
        format!("{}{}", head, self.trailing())
    }

    /// Content with `rendered` written into the output slot, or the stripped
    /// content when there is no slot.
    pub fn with_output(&self, rendered: &str) -> String {
        match self.output_at {
            Some(at) => format!("{} {}{}", &self.content[..at], rendered, self.trailing()),
            None => self.stripped(),
        }
    }

    /// Content annotated with an error message after the authored text.
    pub fn with_annotation(&self, message: &str) -> String {
        format!(
            "{}{} {}}}}}{}",
            self.content[..self.authored_end].trim_end(),
            ANNOTATION_MARKER,
            sanitize(message),
            self.trailing()
        )
    }

    /// 1-based character column of a byte offset in the content.
    pub fn column(&self, offset: usize) -> usize {
        let offset = offset.min(self.content.len());
        self.content
            .char_indices()
            .take_while(|(i, _)| *i < offset)
            .count()
            + 1
    }
}

/// Makes a message safe inside `\text{...}` within a math region.
pub fn sanitize(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '\\' => out.push('/'),
            '{' | '[' => out.push('('),
            '}' | ']' => out.push(')'),
            '$' => out.push_str("\\$"),
            '%' | '&' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("**"),
            '\n' | '\r' | '\t' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Statement operators outside `[...]`, up to and including the first
/// output operator. Comparison forms (`<=`, `>=`, `!=`) are ignored.
fn scan_operators(text: &str) -> Vec<(Operator, usize)> {
    let bytes = text.as_bytes();
    let mut ops = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let op = match bytes[i] {
            b'[' => {
                depth += 1;
                None
            }
            b']' => {
                depth = depth.saturating_sub(1);
                None
            }
            _ if depth > 0 => None,
            b':' if bytes.get(i + 1) == Some(&b'=') => Some(Operator::Define),
            b'=' => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(b'='), Some(b'=')) => Some(Operator::UnitDefine),
                (Some(b'='), _) => Some(Operator::Evaluate),
                (Some(b'>'), _) => Some(Operator::Symbolic),
                _ if i > 0 && matches!(bytes[i - 1], b'<' | b'>' | b'!') => None,
                _ => Some(Operator::Equals),
            },
            _ => None,
        };
        match op {
            Some(op) => {
                ops.push((op, i));
                if matches!(op, Operator::Evaluate | Operator::Symbolic) {
                    break;
                }
                i += op.len();
            }
            None => i += 1,
        }
    }
    ops
}

fn invalid(message: impl Into<String>, at: usize, len: usize) -> Form<'static> {
    Form::Invalid(Error::parse(message, at, at + len))
}

fn check_no_bare_equals(ops: &[(Operator, usize)]) -> Option<Form<'static>> {
    ops.iter().find(|(op, _)| *op == Operator::Equals).map(|(_, at)| {
        invalid(
            "bare '=' is not allowed next to ':=', '==', '=>' or '==='; use ':=' to define or '==' to evaluate",
            *at,
            1,
        )
    })
}

fn classify_with_output<'a>(
    content: &'a str,
    authored: &[(Operator, usize)],
    (op, at): (Operator, usize),
) -> Form<'a> {
    if let Some(form) = check_no_bare_equals(authored) {
        return form;
    }
    if let Some((_, u)) = authored.iter().find(|(o, _)| *o == Operator::UnitDefine) {
        return invalid("a unit definition cannot be evaluated", *u, 3);
    }
    let defines: Vec<usize> = authored.iter().map(|(_, p)| *p).collect();
    match (defines.as_slice(), op) {
        ([], Operator::Evaluate) => {
            let expr = Piece::of(content, 0, at);
            if expr.text.is_empty() {
                return invalid("nothing to evaluate before '=='", at, 2);
            }
            Form::Evaluate { expr }
        }
        ([], _) => {
            let expr = Piece::of(content, 0, at);
            if expr.text.is_empty() {
                return invalid("nothing to show before '=>'", at, 2);
            }
            Form::Symbolic { name: None, expr }
        }
        ([d], _) => {
            let name = Piece::of(content, 0, *d);
            let body = Piece::of(content, d + 2, at);
            if name.text.is_empty() {
                return invalid("missing name before ':='", *d, 2);
            }
            if body.text.is_empty() {
                return invalid("missing expression after ':='", *d, 2);
            }
            if op == Operator::Evaluate {
                Form::DefineEvaluate { name, body }
            } else {
                Form::Symbolic {
                    name: Some(name),
                    expr: body,
                }
            }
        }
        ([_, second, ..], _) => invalid("only one ':=' is allowed per statement", *second, 2),
    }
}

fn classify_without_output<'a>(
    content: &'a str,
    ops: &[(Operator, usize)],
    end: usize,
) -> Form<'a> {
    if let Some(form) = check_no_bare_equals(ops) {
        return form;
    }
    match ops {
        [(Operator::Define, d)] => {
            let name = Piece::of(content, 0, *d);
            let body = Piece::of(content, d + 2, end);
            if name.text.is_empty() {
                invalid("missing name before ':='", *d, 2)
            } else if body.text.is_empty() {
                invalid("missing expression after ':='", *d, 2)
            } else {
                Form::Define { name, body }
            }
        }
        [(Operator::UnitDefine, u)] => {
            let name = Piece::of(content, 0, *u);
            let body = Piece::of(content, u + 3, end);
            if name.text.is_empty() {
                invalid("missing unit name before '==='", *u, 3)
            } else {
                Form::UnitDefinition { name, body }
            }
        }
        [_, (op, at), ..] => invalid(
            format!("unexpected '{}' after another statement operator", op.as_str()),
            *at,
            op.len(),
        ),
        _ => invalid("empty statement", 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_math_is_not_a_statement() {
        assert!(Statement::split("a^2 + b^2 = c^2").is_none());
        assert!(Statement::split("x \\leq y").is_none());
    }

    #[test]
    fn define_evaluate_pieces_and_output() {
        let s = Statement::split("F := m*a == 49.05 [N] ").unwrap();
        match &s.form {
            Form::DefineEvaluate { name, body } => {
                assert_eq!(name.text, "F");
                assert_eq!(body.text, "m*a");
                assert_eq!(body.offset, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(s.stripped(), "F := m*a == ");
        assert_eq!(s.with_output("49.05 [N]"), "F := m*a == 49.05 [N] ");
    }

    #[test]
    fn units_in_brackets_do_not_hide_operators() {
        let s = Statement::split("v := 3 [m/s]").unwrap();
        assert!(matches!(s.form, Form::Define { .. }));
    }

    #[test]
    fn bare_equals_mixed_with_define_is_rejected() {
        let s = Statement::split("x := 5 = 5").unwrap();
        assert!(matches!(s.form, Form::Invalid(Error::Parse { .. })));
    }

    #[test]
    fn annotation_round_trip() {
        let s = Statement::split("V := 37824").unwrap();
        let annotated = s.with_annotation("'V' collides with unit 'V' (compound unit)");
        assert!(annotated.starts_with("V := 37824 \\quad \\color{red}{\\text{Error: "));
        let again = Statement::split(&annotated).unwrap();
        assert_eq!(again.stripped(), "V := 37824");
        assert!(matches!(again.form, Form::Define { .. }));
    }

    #[test]
    fn columns_count_characters() {
        let s = Statement::split("α := β ==").unwrap();
        assert_eq!(s.column(s.content.find(":=").unwrap()), 3);
    }

    #[test]
    fn sanitize_escapes_braces_and_dollars() {
        assert_eq!(sanitize("a{b}\\c $5"), "a(b)/c \\$5");
    }
}
