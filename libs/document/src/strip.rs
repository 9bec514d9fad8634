use crate::span::{find_regions, substitute};
use calcmark_engine::Statement;

/// Removes every machine-written part: evaluation outputs and error
/// annotations. Authored text and trailing whitespace are kept, so the
/// result is stable under repeated stripping.
pub fn strip_computed(doc: &str) -> String {
    let mut out = doc.to_string();
    for span in find_regions(doc).iter().rev() {
        let content = span.content(doc);
        let Some(statement) = Statement::split(content) else {
            continue;
        };
        let stripped = statement.stripped();
        if stripped != content {
            out = substitute(&out, span, &stripped);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_outputs_and_annotations() {
        let doc = "$F := m*a == 49.05 [N]$ and $V := 3 \\quad \\color{red}{\\text{Error: x}}$\n";
        assert_eq!(strip_computed(doc), "$F := m*a ==$ and $V := 3$\n");
    }

    #[test]
    fn leaves_plain_math_alone() {
        let doc = "$a^2 + b^2 = c^2$ ```$x == 3$```";
        assert_eq!(strip_computed(doc), doc);
    }

    #[test]
    fn keeps_trailing_whitespace_in_blocks() {
        let doc = "$$\nx == 3\n$$";
        assert_eq!(strip_computed(doc), "$$\nx ==\n$$");
    }
}
