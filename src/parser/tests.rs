// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::*;
use crate::ast::{BinaryOp, Expr, Loc, UnaryOp};
use crate::common::ErrorCode;

fn parse_ok(input: &str) -> Expr {
    parse(input).unwrap().strip_loc()
}

fn parse_errs(input: &str) -> Vec<FormulaError> {
    parse(input).unwrap_err()
}

// ============================================================================
// Atom parsing tests
// ============================================================================

#[test]
fn test_parse_number() {
    let ast = parse_ok("42");
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "42" && n == 42.0));
}

#[test]
fn test_parse_float() {
    let ast = parse_ok("2.75");
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "2.75" && (n - 2.75).abs() < 0.001));
}

#[test]
fn test_parse_number_trailing_dot() {
    // "1." is one number token and f64 accepts it
    let ast = parse_ok("1.");
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "1." && n == 1.0));
}

#[test]
fn test_parse_string_double_quoted() {
    let ast = parse_ok("\"hello\"");
    assert_eq!(Expr::Str("hello".to_string(), Loc::default()), ast);
}

#[test]
fn test_parse_string_single_quoted() {
    let ast = parse_ok("'hello'");
    assert_eq!(Expr::Str("hello".to_string(), Loc::default()), ast);
}

#[test]
fn test_parse_string_empty() {
    let ast = parse_ok("\"\"");
    assert_eq!(Expr::Str(String::new(), Loc::default()), ast);
}

#[test]
fn test_parse_identifier() {
    let ast = parse_ok("foo");
    assert!(matches!(ast, Expr::Var(id, _) if id == "foo"));
}

#[test]
fn test_parse_identifier_case_preserved() {
    // variable names are exact-match, unlike function names
    let ast = parse_ok("errorCount");
    assert!(matches!(ast, Expr::Var(id, _) if id == "errorCount"));
}

#[test]
fn test_parse_parenthesized() {
    let ast = parse_ok("(42)");
    let expected = Expr::Const("42".to_string(), 42.0, Loc::default());
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_empty() {
    let errs = parse_errs("");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::EmptyFormula, errs[0].code);
}

#[test]
fn test_parse_whitespace_only() {
    let errs = parse_errs("   \n\t ");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::EmptyFormula, errs[0].code);
}

// ============================================================================
// Binary operator tests
// ============================================================================

#[test]
fn test_parse_addition() {
    let ast = parse_ok("1 + 2");
    let expected = Expr::Op2(
        BinaryOp::Add,
        Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
        Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_subtraction_left_assoc() {
    let ast = parse_ok("1 - 2 - 3");
    let expected = Expr::Op2(
        BinaryOp::Sub,
        Box::new(Expr::Op2(
            BinaryOp::Sub,
            Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
            Loc::default(),
        )),
        Box::new(Expr::Const("3".to_string(), 3.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_mul_binds_tighter_than_add() {
    let ast = parse_ok("1 + 2 * 3");
    let expected = Expr::Op2(
        BinaryOp::Add,
        Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
        Box::new(Expr::Op2(
            BinaryOp::Mul,
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
            Box::new(Expr::Const("3".to_string(), 3.0, Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_div_and_mod() {
    let ast = parse_ok("a / b % c");
    let expected = Expr::Op2(
        BinaryOp::Mod,
        Box::new(Expr::Op2(
            BinaryOp::Div,
            Box::new(Expr::Var("a".to_string(), Loc::default())),
            Box::new(Expr::Var("b".to_string(), Loc::default())),
            Loc::default(),
        )),
        Box::new(Expr::Var("c".to_string(), Loc::default())),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_exponent_right_assoc() {
    // 2^3^2 is 2^(3^2), not (2^3)^2
    let ast = parse_ok("2 ^ 3 ^ 2");
    let expected = Expr::Op2(
        BinaryOp::Exp,
        Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
        Box::new(Expr::Op2(
            BinaryOp::Exp,
            Box::new(Expr::Const("3".to_string(), 3.0, Loc::default())),
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_double_star_is_exponent() {
    assert_eq!(parse_ok("2 ^ 8"), parse_ok("2 ** 8"));
}

#[test]
fn test_parse_unary_binds_tighter_than_exponent() {
    // -2^2 is (-2)^2
    let ast = parse_ok("-2 ^ 2");
    let expected = Expr::Op2(
        BinaryOp::Exp,
        Box::new(Expr::Op1(
            UnaryOp::Negative,
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
            Loc::default(),
        )),
        Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_unary_chains() {
    let ast = parse_ok("!!x");
    let expected = Expr::Op1(
        UnaryOp::Not,
        Box::new(Expr::Op1(
            UnaryOp::Not,
            Box::new(Expr::Var("x".to_string(), Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);

    let ast = parse_ok("--1");
    let expected = Expr::Op1(
        UnaryOp::Negative,
        Box::new(Expr::Op1(
            UnaryOp::Negative,
            Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_comparison_ops() {
    let cases = [
        (">", BinaryOp::Gt),
        ("<", BinaryOp::Lt),
        (">=", BinaryOp::Gte),
        ("<=", BinaryOp::Lte),
        ("==", BinaryOp::Eq),
        ("!=", BinaryOp::Neq),
        ("===", BinaryOp::StrictEq),
        ("!==", BinaryOp::StrictNeq),
    ];
    for (sym, op) in cases {
        let ast = parse_ok(&format!("a {sym} b"));
        let expected = Expr::Op2(
            op,
            Box::new(Expr::Var("a".to_string(), Loc::default())),
            Box::new(Expr::Var("b".to_string(), Loc::default())),
            Loc::default(),
        );
        assert_eq!(expected, ast, "operator {sym}");
    }
}

#[test]
fn test_parse_and_binds_tighter_than_or() {
    let ast = parse_ok("a || b && c");
    let expected = Expr::Op2(
        BinaryOp::Or,
        Box::new(Expr::Var("a".to_string(), Loc::default())),
        Box::new(Expr::Op2(
            BinaryOp::And,
            Box::new(Expr::Var("b".to_string(), Loc::default())),
            Box::new(Expr::Var("c".to_string(), Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_comparison_binds_tighter_than_logical() {
    let ast = parse_ok("1 < 2 && 3 > 2");
    let expected = Expr::Op2(
        BinaryOp::And,
        Box::new(Expr::Op2(
            BinaryOp::Lt,
            Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
            Loc::default(),
        )),
        Box::new(Expr::Op2(
            BinaryOp::Gt,
            Box::new(Expr::Const("3".to_string(), 3.0, Loc::default())),
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

// ============================================================================
// Conditional tests
// ============================================================================

#[test]
fn test_parse_ternary() {
    let ast = parse_ok("1 ? 2 : 3");
    let expected = Expr::If(
        Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
        Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
        Box::new(Expr::Const("3".to_string(), 3.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_ternary_right_assoc() {
    // a ? b : c ? d : e groups as a ? b : (c ? d : e)
    let ast = parse_ok("a ? b : c ? d : e");
    let expected = Expr::If(
        Box::new(Expr::Var("a".to_string(), Loc::default())),
        Box::new(Expr::Var("b".to_string(), Loc::default())),
        Box::new(Expr::If(
            Box::new(Expr::Var("c".to_string(), Loc::default())),
            Box::new(Expr::Var("d".to_string(), Loc::default())),
            Box::new(Expr::Var("e".to_string(), Loc::default())),
            Loc::default(),
        )),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_ternary_nested_in_then_branch() {
    let ast = parse_ok("a ? b ? c : d : e");
    let expected = Expr::If(
        Box::new(Expr::Var("a".to_string(), Loc::default())),
        Box::new(Expr::If(
            Box::new(Expr::Var("b".to_string(), Loc::default())),
            Box::new(Expr::Var("c".to_string(), Loc::default())),
            Box::new(Expr::Var("d".to_string(), Loc::default())),
            Loc::default(),
        )),
        Box::new(Expr::Var("e".to_string(), Loc::default())),
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_ternary_condition_can_be_comparison() {
    let ast = parse_ok("x > 5 ? 1 : 0");
    if let Expr::If(cond, _, _, _) = ast {
        assert!(matches!(*cond, Expr::Op2(BinaryOp::Gt, _, _, _)));
    } else {
        panic!("expected a conditional");
    }
}

#[test]
fn test_parse_if_function_desugars_to_conditional() {
    // the three-argument if() builds the same node as the ternary
    assert_eq!(parse_ok("1 ? 2 : 3"), parse_ok("if(1, 2, 3)"));
    assert_eq!(parse_ok("1 ? 2 : 3"), parse_ok("IF(1, 2, 3)"));
}

#[test]
fn test_parse_if_function_other_arity_stays_call() {
    let ast = parse_ok("if(1, 2)");
    let expected = Expr::App(
        "if".to_string(),
        vec![
            Expr::Const("1".to_string(), 1.0, Loc::default()),
            Expr::Const("2".to_string(), 2.0, Loc::default()),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

// ============================================================================
// Function call tests
// ============================================================================

#[test]
fn test_parse_call_no_args() {
    let ast = parse_ok("totalErrors()");
    let expected = Expr::App("totalerrors".to_string(), vec![], Loc::default());
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_call_lowercases_name() {
    let ast = parse_ok("MAX(a, b)");
    let expected = Expr::App(
        "max".to_string(),
        vec![
            Expr::Var("a".to_string(), Loc::default()),
            Expr::Var("b".to_string(), Loc::default()),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_call_trailing_comma() {
    let ast = parse_ok("min(a,)");
    let expected = Expr::App(
        "min".to_string(),
        vec![Expr::Var("a".to_string(), Loc::default())],
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_unknown_function_call() {
    // an unknown callee still parses; rejecting the name is the semantic
    // check's job, not the parser's
    let ast = parse_ok("foo(1)");
    let expected = Expr::App(
        "foo".to_string(),
        vec![Expr::Const("1".to_string(), 1.0, Loc::default())],
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_nested_calls() {
    let ast = parse_ok("max(min(a, b), c)");
    let expected = Expr::App(
        "max".to_string(),
        vec![
            Expr::App(
                "min".to_string(),
                vec![
                    Expr::Var("a".to_string(), Loc::default()),
                    Expr::Var("b".to_string(), Loc::default()),
                ],
                Loc::default(),
            ),
            Expr::Var("c".to_string(), Loc::default()),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_call_args_are_full_expressions() {
    let ast = parse_ok("min(1 + 2, a ? 3 : 4)");
    assert!(matches!(&ast, Expr::App(name, args, _)
        if name == "min"
            && matches!(args[0], Expr::Op2(BinaryOp::Add, _, _, _))
            && matches!(args[1], Expr::If(_, _, _, _))));
}

#[test]
fn test_parse_string_argument() {
    let ast = parse_ok("dimension(\"fluency\")");
    let expected = Expr::App(
        "dimension".to_string(),
        vec![Expr::Str("fluency".to_string(), Loc::default())],
        Loc::default(),
    );
    assert_eq!(expected, ast);
}

// ============================================================================
// Error recovery tests
// ============================================================================

#[test]
fn test_error_unclosed_paren() {
    let errs = parse_errs("(3");
    assert!(!errs.is_empty());
    assert_eq!(ErrorCode::UnclosedParen, errs[0].code);
}

#[test]
fn test_error_unclosed_call() {
    let input = "dimension(\"fluency\"";
    let errs = parse_errs(input);
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::UnclosedParen, errs[0].code);
    // positioned at the end of the input
    assert_eq!(input.len() as u16, errs[0].start);
}

#[test]
fn test_error_missing_operand() {
    let errs = parse_errs("3 +");
    assert!(!errs.is_empty());
    assert_eq!(ErrorCode::UnrecognizedEof, errs[0].code);

    // recovery still yields a tree with a zero placeholder
    let output = parse_partial("3 +");
    let expected = Expr::Op2(
        BinaryOp::Add,
        Box::new(Expr::Const("3".to_string(), 3.0, Loc::default())),
        Box::new(Expr::Const("0".to_string(), 0.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(Some(expected), output.ast.map(|e| e.strip_loc()));
}

#[test]
fn test_error_invalid_token() {
    let errs = parse_errs("1 @ 2");
    assert_eq!(ErrorCode::InvalidToken, errs[0].code);
}

#[test]
fn test_error_lone_equals() {
    let errs = parse_errs("a = 1");
    assert_eq!(ErrorCode::InvalidToken, errs[0].code);
    assert_eq!(2, errs[0].start);
    assert_eq!(3, errs[0].end);
}

#[test]
fn test_error_malformed_number() {
    let errs = parse_errs("1.2.3");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::MalformedNumber, errs[0].code);

    // the malformed literal is kept in the tree, reading as zero
    let output = parse_partial("1.2.3");
    let expected = Expr::Const("1.2.3".to_string(), 0.0, Loc::default());
    assert_eq!(Some(expected), output.ast.map(|e| e.strip_loc()));
}

#[test]
fn test_error_extra_token() {
    let errs = parse_errs("1 2");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::ExtraToken, errs[0].code);
    assert_eq!(2, errs[0].start);
}

#[test]
fn test_error_unknown_token_reported_once() {
    // '@' already carries invalid_token from the lexical phase; the
    // leftover check and the ternary's ':' recovery add nothing on top
    let errs = parse_errs("1 @");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::InvalidToken, errs[0].code);
    assert_eq!(2, errs[0].start);

    let errs = parse_errs("1 ? 2 @");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::InvalidToken, errs[0].code);

    // a real token beyond the unknown one is still a leftover
    let errs = parse_errs("1 @ 2");
    assert_eq!(2, errs.len());
    assert_eq!(ErrorCode::InvalidToken, errs[0].code);
    assert_eq!(ErrorCode::ExtraToken, errs[1].code);
    assert_eq!(4, errs[1].start);
}

#[test]
fn test_error_function_without_call_syntax() {
    let errs = parse_errs("max + 1");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::ExpectedLParen, errs[0].code);

    // the bare name falls back to a variable reference
    let output = parse_partial("max + 1");
    let expected = Expr::Op2(
        BinaryOp::Add,
        Box::new(Expr::Var("max".to_string(), Loc::default())),
        Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(Some(expected), output.ast.map(|e| e.strip_loc()));
}

#[test]
fn test_warning_unclosed_string() {
    // a missing closing quote is a warning, not an error: the strict
    // parse still succeeds with the text that was there
    let ast = parse_ok("\"abc");
    assert_eq!(Expr::Str("abc".to_string(), Loc::default()), ast);

    let output = parse_partial("\"abc");
    assert!(output.errors.is_empty());
    assert_eq!(1, output.warnings.len());
    assert_eq!(ErrorCode::UnclosedString, output.warnings[0].code);
}

#[test]
fn test_error_empty_parens() {
    let errs = parse_errs("()");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::UnrecognizedToken, errs[0].code);
}

#[test]
fn test_error_missing_colon() {
    let errs = parse_errs("1 ? 2");
    assert_eq!(1, errs.len());
    assert_eq!(ErrorCode::UnrecognizedEof, errs[0].code);

    let output = parse_partial("1 ? 2");
    let expected = Expr::If(
        Box::new(Expr::Const("1".to_string(), 1.0, Loc::default())),
        Box::new(Expr::Const("2".to_string(), 2.0, Loc::default())),
        Box::new(Expr::Const("0".to_string(), 0.0, Loc::default())),
        Loc::default(),
    );
    assert_eq!(Some(expected), output.ast.map(|e| e.strip_loc()));
}

#[test]
fn test_recovery_reports_every_problem() {
    // two bad tokens and a leftover: one pass reports all three
    let output = parse_partial("= = 2");
    let codes: Vec<ErrorCode> = output.errors.iter().map(|e| e.code).collect();
    assert_eq!(
        vec![
            ErrorCode::InvalidToken,
            ErrorCode::InvalidToken,
            ErrorCode::ExtraToken
        ],
        codes
    );
    assert!(output.ast.is_some());
}

#[test]
fn test_recovery_hole_in_argument_list() {
    let output = parse_partial("min(, 2)");
    assert_eq!(1, output.errors.len());
    assert_eq!(ErrorCode::UnrecognizedToken, output.errors[0].code);

    // the hole reads as zero and the second argument survives
    let expected = Expr::App(
        "min".to_string(),
        vec![
            Expr::Const("0".to_string(), 0.0, Loc::default()),
            Expr::Const("2".to_string(), 2.0, Loc::default()),
        ],
        Loc::default(),
    );
    assert_eq!(Some(expected), output.ast.map(|e| e.strip_loc()));
}

// ============================================================================
// Location tests
// ============================================================================

#[test]
fn test_loc_binary_expression() {
    let ast = parse("1 + 2").unwrap();
    assert_eq!(Loc::new(0, 5), ast.get_loc());
    if let Expr::Op2(_, left, right, _) = ast {
        assert_eq!(Loc::new(0, 1), left.get_loc());
        assert_eq!(Loc::new(4, 5), right.get_loc());
    } else {
        panic!("expected Op2");
    }
}

#[test]
fn test_loc_call_spans_closing_paren() {
    let ast = parse("max(1, 2)").unwrap();
    assert_eq!(Loc::new(0, 9), ast.get_loc());
}

#[test]
fn test_loc_string_spans_quotes() {
    let ast = parse("\"abc\"").unwrap();
    assert_eq!(Loc::new(0, 5), ast.get_loc());
}
