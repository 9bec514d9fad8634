//! Fuzzing tests to ensure the statement splitter, parser and evaluator handle malformed input gracefully

use calcmark_engine::{Engine, Error, Statement};

/// Runs `content` as a statement if it is one, and evaluates it as an
/// expression either way. Neither may panic.
fn exercise(engine: &mut Engine, content: &str) {
    if let Some(statement) = Statement::split(content) {
        let _ = engine.execute(&statement, 1);
        let _ = statement.stripped();
        let _ = statement.with_annotation("ParseError: x");
    }
    let _ = engine.evaluate(content);
}

/// Test that malformed expressions don't panic
#[test]
fn test_malformed_expressions_no_panic() {
    let mut engine = Engine::default();

    let malformed = vec![
        "",             // Empty
        "(",            // Unclosed paren
        ")",            // Unmatched closing paren
        "[",            // Unclosed bracket
        "{",            // Unclosed brace
        "1 +",          // Incomplete expression
        "+",            // Just operator
        "1 2",          // Missing operator
        "1 + + 2",      // Double operator
        "1 ** 2",       // Double star
        "1 @ 2",        // Invalid character
        "\\",           // Dangling backslash
        "\\frac{1}",    // Missing denominator
        "\\sqrt[",      // Unterminated root index
        "x_",           // Missing subscript
        "5 []",         // Empty unit
        "5 [m/]",       // Broken unit expression
        "5 [m^x]",      // Non-numeric exponent
        ":=",           // Nothing around the operator
        "x :=",         // Missing body
        ":= 3",         // Missing name
        "==",           // Nothing to evaluate
        "x := 1 := 2",  // Two definitions
        "=== m",        // Missing unit name
        "f( := 1",      // Broken signature
        "sin() ==",     // Missing argument
        "log(1, 2, 3) ==", // Too many arguments
    ];

    for content in malformed {
        exercise(&mut engine, content);
    }
}

/// Test that very long expressions are handled
#[test]
fn test_very_long_expressions() {
    let engine = Engine::default();

    let mut expr = "1".to_string();
    for _ in 0..150 {
        expr.push_str(" + 1");
    }
    assert_eq!(engine.evaluate(&expr).unwrap().magnitude, 151.0);

    let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(engine.evaluate(&nested).is_err());
}

/// Flat chains far past the depth limit are parse errors, not stack overflows
#[test]
fn test_long_flat_chains_are_rejected() {
    let mut engine = Engine::default();

    let sum = format!("1{}", "+1".repeat(200_000));
    assert!(matches!(engine.evaluate(&sum), Err(Error::Parse { .. })));

    let product = format!("2{}", "*2".repeat(200_000));
    assert!(matches!(engine.evaluate(&product), Err(Error::Parse { .. })));

    let implicit = format!("2{}", " x".repeat(200_000));
    assert!(matches!(engine.evaluate(&implicit), Err(Error::Parse { .. })));

    let definition = format!("x := y{}", "+1".repeat(200_000));
    let statement = Statement::split(&definition).unwrap();
    assert!(matches!(
        engine.execute(&statement, 1),
        Err(Error::Parse { .. })
    ));
    assert!(matches!(
        engine.evaluate("x"),
        Err(Error::UndefinedSymbol { reason: Some(_), .. })
    ));
}

/// Unit exponents that leave the 32-bit range are errors, not panics
#[test]
fn test_exponent_overflow_is_an_error() {
    let engine = Engine::default();
    for expr in [
        "((1 [m])^2000000000)^2",
        "1 [m^2000000000*m^2000000000]",
        "1 [m^2000000000] * 1 [m^2000000000]",
        "1 [m^-2000000000] / 1 [m^2000000000]",
    ] {
        assert!(
            matches!(engine.evaluate(expr), Err(Error::InvalidExponent(_))),
            "{expr}"
        );
    }
    assert!(engine.evaluate("(1 [m])^2000000000").is_ok());
}

/// Test random character sequences
#[test]
fn test_random_characters() {
    let mut engine = Engine::default();

    let random_strings = vec![
        "!@#$%^&*()",
        "abcdefghijklmnopqrstuvwxyz",
        "1234567890",
        "αβγδε",        // Greek letters
        "中文 := 3",    // Chinese characters
        "\x00\x01\x02", // Control characters
        "\u{202E}x := 1 ==",
        "\u{1F600} ==",
    ];

    for s in random_strings {
        exercise(&mut engine, s);
    }
}

/// Test expressions with unusual whitespace
#[test]
fn test_unusual_whitespace() {
    let engine = Engine::default();

    let expressions = vec![
        "1\t+\t2",   // Tabs
        "1\n+\n2",   // Newlines
        "1   +   2", // Multiple spaces
        "1+2",       // No spaces
        " 1 + 2 ",   // Leading/trailing spaces
        "1 \\, + \\; 2 \\quad", // LaTeX spacing
    ];

    for expr in expressions {
        let result = engine.evaluate(expr);
        assert_eq!(result.unwrap().magnitude, 3.0, "{expr:?}");
    }
}

/// Test that numeric overflow is an error value, not a panic
#[test]
fn test_non_finite_results() {
    let engine = Engine::default();
    for expr in ["10^400", "(-8)^(1/3)", "\\ln(0)", "\\exp(1000)"] {
        assert!(engine.evaluate(expr).is_err(), "{expr}");
    }
}
