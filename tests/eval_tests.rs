use num_bigint::BigInt;

use rill::errors::EvalError;
use rill::runtime::{Evaluator, NullSink, Value, VecSink};
use rill::syntax::parser::parse_text;

// ---
// Test Setup
// ---

/// Evaluates source with echo on, returning (print lines, echo lines).
fn run_with_echo(source: &str) -> (Vec<String>, Vec<String>) {
    let module = parse_text(source).expect("source should parse");
    let mut evaluator = Evaluator::with_echo(true);
    let mut out = VecSink::new();
    let mut echo = VecSink::new();
    evaluator
        .evaluate(&module.statements, &mut out, &mut echo)
        .expect("source should evaluate");
    (out.lines, echo.lines)
}

/// Evaluates source expecting a failure, returning the error and the print
/// lines produced before it.
fn run_expecting_error(source: &str) -> (EvalError, Vec<String>) {
    let module = parse_text(source).expect("source should parse");
    let mut evaluator = Evaluator::new();
    let mut out = VecSink::new();
    let err = evaluator
        .evaluate(&module.statements, &mut out, &mut NullSink)
        .expect_err("source should fail to evaluate");
    (err, out.lines)
}

// ---
// Arithmetic
// ---

#[test]
fn addition_echoes_its_result() {
    let (out, echo) = run_with_echo("2 + 3");
    assert!(out.is_empty());
    assert_eq!(echo, vec!["-> 5"]);
}

#[test]
fn integer_power_uses_exact_arithmetic() {
    let (_, echo) = run_with_echo("2 ^ 10");
    assert_eq!(echo, vec!["-> 1024"]);
}

#[test]
fn integer_power_exceeds_machine_width() {
    let (_, echo) = run_with_echo("2 ^ 200");
    assert_eq!(
        echo,
        vec!["-> 1606938044258990275541962092341162602522202993782792835301376"]
    );
}

#[test]
fn integer_arithmetic_matches_native_results() {
    for a in -4i64..=4 {
        for b in -4i64..=4 {
            let (_, echo) = run_with_echo(&format!("{a} + {b}\n{a} - {b}\n{a} * {b}"));
            let expected = vec![
                format!("-> {}", a + b),
                format!("-> {}", a - b),
                format!("-> {}", a * b),
            ];
            assert_eq!(echo, expected, "operands {a}, {b}");
        }
    }
}

#[test]
fn negative_literals_evaluate_through_unary_rejection() {
    // `-4` parses as unary negation, which is outside the evaluated subset;
    // the addition's left operand fails when it is evaluated.
    let (err, _) = run_expecting_error("-4 + 1");
    assert_eq!(
        err,
        EvalError::UnhandledExpression {
            rendering: "-4".into(),
        }
    );
}

#[test]
fn float_arithmetic_keeps_the_decimal_point() {
    let (_, echo) = run_with_echo("1.5 + 2.5\n3.0 * 2.0\n1.0 / 4.0\n2.0 ^ 3.0\n5.5 - 0.5");
    assert_eq!(echo, vec!["-> 4.0", "-> 6.0", "-> 0.25", "-> 8.0", "-> 5.0"]);
}

#[test]
fn integer_division_truncates() {
    let (_, echo) = run_with_echo("7 / 2");
    assert_eq!(echo, vec!["-> 3"]);
}

#[test]
fn integer_division_by_zero_fails() {
    let (err, _) = run_expecting_error("7 / 0");
    assert_eq!(
        err.to_string(),
        "integer division by zero: 7 / 0"
    );
}

#[test]
fn negative_exponents_cannot_be_reached_from_source_yet() {
    // A negative exponent literal is a unary expression, so the power's
    // right operand fails before exponentiation starts.
    let (err, _) = run_expecting_error("2 ^ -1");
    assert_eq!(
        err,
        EvalError::UnhandledExpression {
            rendering: "-1".into(),
        }
    );
}

// ---
// Strict typing
// ---

#[test]
fn every_operator_rejects_mixed_numeric_operands() {
    for op in ["^", "*", "/", "+", "-"] {
        let (err, _) = run_expecting_error(&format!("1 {op} 2.0"));
        assert_eq!(
            err.to_string(),
            format!("unsupported operand types for '{op}': 1 and 2.0")
        );

        let (err, _) = run_expecting_error(&format!("2.0 {op} 1"));
        assert_eq!(
            err.to_string(),
            format!("unsupported operand types for '{op}': 2.0 and 1")
        );
    }
}

#[test]
fn string_operands_keep_quotes_in_the_error() {
    let (err, _) = run_expecting_error("\"a\" + 1");
    assert_eq!(
        err.to_string(),
        "unsupported operand types for '+': \"a\" and 1"
    );
}

#[test]
fn nil_and_bool_operands_are_rejected() {
    let (err, _) = run_expecting_error("nil + 1");
    assert_eq!(err.to_string(), "unsupported operand types for '+': nil and 1");

    let (err, _) = run_expecting_error("true * false");
    assert_eq!(
        err.to_string(),
        "unsupported operand types for '*': true and false"
    );
}

// ---
// Print
// ---

#[test]
fn print_writes_to_the_primary_channel_without_echo() {
    let (out, echo) = run_with_echo("$print 2 * 3");
    assert_eq!(out, vec!["6"]);
    // Print's value is nil, which echo suppresses.
    assert!(echo.is_empty());
}

#[test]
fn printed_floats_never_look_like_integers() {
    let (out, _) = run_with_echo("$print 1e16");
    assert_eq!(out, vec!["10000000000000000.0"]);
}

#[test]
fn large_whole_floats_keep_the_decimal_point_in_errors() {
    let (err, _) = run_expecting_error("1e16 + 2");
    assert_eq!(
        err.to_string(),
        "unsupported operand types for '+': 10000000000000000.0 and 2"
    );
}

#[test]
fn print_renders_strings_bare() {
    let (out, _) = run_with_echo("$print \"hello\"");
    assert_eq!(out, vec!["hello"]);
}

#[test]
fn print_leaves_the_stack_balanced_for_every_value_type() {
    for source in ["$print nil", "$print true", "$print 1", "$print 1.5", "$print \"s\""] {
        let module = parse_text(source).unwrap();
        let mut evaluator = Evaluator::new();
        evaluator
            .evaluate(&module.statements, &mut NullSink, &mut NullSink)
            .unwrap();
        assert_eq!(evaluator.depth(), 0, "residue after {source}");
    }
}

#[test]
fn nested_print_prints_inner_first() {
    let (out, _) = run_with_echo("$print $print 7");
    // Inner print emits 7, outer print emits the inner result, nil.
    assert_eq!(out, vec!["7", "nil"]);
}

// ---
// Unhandled expressions
// ---

#[test]
fn unsupported_forms_fail_with_their_canonical_rendering() {
    let cases = [
        ("x", "unhandled expression: x"),
        ("$version", "unhandled expression: $version"),
        ("1 < 2", "unhandled expression: 1 < 2"),
        ("1 === 2", "unhandled expression: 1 === 2"),
        ("true && false", "unhandled expression: true && false"),
        ("nil ?? 1", "unhandled expression: nil ?? 1"),
        ("x := 1", "unhandled expression: x := 1"),
        ("x = 1", "unhandled expression: x = 1"),
        ("x += 1", "unhandled expression: x += 1"),
        ("!true", "unhandled expression: !true"),
        ("?nil", "unhandled expression: ?nil"),
        ("(1 + 2)", "unhandled expression: (1 + 2)"),
        ("1 // 2", "unhandled expression: 1 // 2"),
        ("5 % 3", "unhandled expression: 5 % 3"),
        ("a.b", "unhandled expression: a.b"),
        ("2 in x", "unhandled expression: 2 in x"),
    ];
    for (source, expected) in cases {
        let (err, _) = run_expecting_error(source);
        assert_eq!(err.to_string(), expected, "source {source:?}");
    }
}

#[test]
fn unsupported_operators_are_rejected_before_their_operands_run() {
    // If the operands ran, the inner print would have produced output.
    let (err, out) = run_expecting_error("($print 1) // ($print 2)");
    assert!(matches!(err, EvalError::UnhandledExpression { .. }));
    assert!(out.is_empty());
}

#[test]
fn stack_stays_balanced_after_early_rejection() {
    let module = parse_text("1 // 2").unwrap();
    let mut evaluator = Evaluator::new();
    let _ = evaluator.evaluate(&module.statements, &mut NullSink, &mut NullSink);
    assert_eq!(evaluator.depth(), 0);
}

// ---
// Error propagation
// ---

#[test]
fn a_failure_aborts_later_statements_but_keeps_prior_output() {
    let (err, out) = run_expecting_error("$print 1\nbad_ident\n$print 2");
    assert_eq!(out, vec!["1"]);
    assert_eq!(err.to_string(), "unhandled expression: bad_ident");
}

#[test]
fn comments_and_blank_lines_evaluate_to_nothing() {
    let (out, echo) = run_with_echo("## doc\n# note\n\n$print 9");
    assert_eq!(out, vec!["9"]);
    assert!(echo.is_empty());
}

#[test]
fn echo_off_silences_the_diagnostic_channel() {
    let module = parse_text("2 + 3").unwrap();
    let mut evaluator = Evaluator::new();
    let mut echo = VecSink::new();
    evaluator
        .evaluate(&module.statements, &mut NullSink, &mut echo)
        .unwrap();
    assert!(echo.lines.is_empty());
}

#[test]
fn evaluator_state_survives_between_calls() {
    let mut evaluator = Evaluator::with_echo(true);
    let mut echo = VecSink::new();

    let first = parse_text("1 + 1").unwrap();
    evaluator
        .evaluate(&first.statements, &mut NullSink, &mut echo)
        .unwrap();

    let second = parse_text("2 + 2").unwrap();
    evaluator
        .evaluate(&second.statements, &mut NullSink, &mut echo)
        .unwrap();

    assert_eq!(echo.lines, vec!["-> 2", "-> 4"]);
    assert_eq!(evaluator.depth(), 0);

    evaluator.reset();
    assert_eq!(evaluator.stack(), &[] as &[Value]);
}

#[test]
fn expression_evaluation_pushes_exactly_one_value() {
    let module = parse_text("40 + 2").unwrap();
    let mut evaluator = Evaluator::new();
    match &module.statements[0] {
        rill::ast::Stmt::Expr(expr) => {
            evaluator.evaluate_expr(expr, &mut NullSink).unwrap();
            assert_eq!(evaluator.stack(), &[Value::Int(BigInt::from(42))]);
        }
        other => panic!("expected expression statement, got {other:?}"),
    }
}
