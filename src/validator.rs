// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Semantic checks over a parsed formula.
//!
//! The walk is exhaustive: every branch of every conditional is visited
//! whether or not evaluation would reach it, so a formula validates the
//! same way no matter what context it later runs against.

use crate::ast::Expr;
use crate::builtins;
use crate::common::{ErrorCode, FormulaError};

#[derive(Clone, Debug, Default)]
pub struct Checked {
    pub errors: Vec<FormulaError>,
    pub warnings: Vec<FormulaError>,
}

impl Checked {
    fn walk(&mut self, expr: &Expr) {
        match expr {
            Expr::Const(_, _, _) | Expr::Str(_, _) | Expr::Var(_, _) => {}
            Expr::App(name, args, loc) => {
                match builtins::arity(name) {
                    None => {
                        self.errors.push(FormulaError {
                            start: loc.start,
                            end: loc.end,
                            code: ErrorCode::UnknownFunction,
                        });
                    }
                    Some((min_args, max_args)) => {
                        // a bad argument count is only a warning: the
                        // implementations read missing arguments as zero
                        // and ignore extras, so the call still evaluates
                        let n = args.len();
                        if n < min_args || max_args.map(|max| n > max).unwrap_or(false) {
                            self.warnings.push(FormulaError {
                                start: loc.start,
                                end: loc.end,
                                code: ErrorCode::BadFunctionArgs,
                            });
                        }
                    }
                }
                for arg in args {
                    self.walk(arg);
                }
            }
            Expr::Op1(_, operand, _) => self.walk(operand),
            Expr::Op2(_, left, right, _) => {
                self.walk(left);
                self.walk(right);
            }
            Expr::If(cond, t, f, _) => {
                self.walk(cond);
                self.walk(t);
                self.walk(f);
            }
        }
    }
}

/// Check a parse tree for semantic problems: calls to names outside the
/// two registries, and argument counts outside a builtin's arity range.
pub fn check(expr: &Expr) -> Checked {
    let mut checked = Checked::default();
    checked.walk(expr);
    checked
}

#[cfg(test)]
fn must_parse(input: &str) -> Expr {
    crate::parser::parse(input).unwrap()
}

#[test]
fn test_known_functions_are_clean() {
    for input in [
        "min(1, 2)",
        "dimension(\"fluency\") * weight(\"fluency\")",
        "qualityLevel(88)",
        "totalErrors() / unitCount()",
        "if(1, 2, 3)",
    ] {
        let checked = check(&must_parse(input));
        assert!(checked.errors.is_empty(), "{input}: {:?}", checked.errors);
        assert!(checked.warnings.is_empty(), "{input}: {:?}", checked.warnings);
    }
}

#[test]
fn test_unknown_function() {
    let checked = check(&must_parse("foo(1)"));
    assert_eq!(1, checked.errors.len());
    assert_eq!(ErrorCode::UnknownFunction, checked.errors[0].code);
    // the diagnostic spans the whole call
    assert_eq!(0, checked.errors[0].start);
    assert_eq!(6, checked.errors[0].end);
}

#[test]
fn test_walk_is_exhaustive() {
    // both branches of a conditional are checked even though only one
    // would ever evaluate
    let checked = check(&must_parse("1 ? foo(1) : bar(2)"));
    assert_eq!(2, checked.errors.len());
    assert!(
        checked
            .errors
            .iter()
            .all(|e| e.code == ErrorCode::UnknownFunction)
    );

    let checked = check(&must_parse("-foo(1) + max(bar(2), 3)"));
    assert_eq!(2, checked.errors.len());
}

#[test]
fn test_arity_warnings() {
    for input in ["abs()", "abs(1, 2)", "pow(1)", "clamp(1, 2)", "if(1, 2)"] {
        let checked = check(&must_parse(input));
        assert!(checked.errors.is_empty(), "{input}");
        assert_eq!(1, checked.warnings.len(), "{input}");
        assert_eq!(ErrorCode::BadFunctionArgs, checked.warnings[0].code, "{input}");
    }
}

#[test]
fn test_variadic_arity() {
    for input in ["min(1)", "min(1, 2, 3, 4, 5)", "sum(1, 2, 3)", "count()"] {
        let checked = check(&must_parse(input));
        assert!(checked.warnings.is_empty(), "{input}");
    }
    // variadic still has a lower bound
    let checked = check(&must_parse("min()"));
    assert_eq!(1, checked.warnings.len());
}

#[test]
fn test_variables_are_not_checked() {
    // unknown identifiers are legal; they read as zero at evaluation
    let checked = check(&must_parse("unknownVar + 1"));
    assert!(checked.errors.is_empty());
    assert!(checked.warnings.is_empty());
}
