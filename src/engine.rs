// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The two entry points the platform calls: `validate_formula` for the
//! formula editor and `execute_formula` for the scoring engine.
//!
//! Both return structured results that serialize to camelCase JSON and
//! never panic on malformed input: validation reports every diagnostic a
//! formula produces, and execution folds any failure into
//! `ExecutionResult { success: false, .. }`.

use std::time::Instant;

use serde::Serialize;

use crate::ast::Loc;
use crate::common::{ErrorCode, FormulaError};
use crate::context::FormulaContext;
use crate::interpreter::Evaluator;
use crate::parser;
use crate::validator;
use crate::value::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found during validation, positioned in the source
/// text where possible.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: ErrorCode,
    pub message: String,
    pub position: Option<Loc>,
    pub severity: Severity,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggested_fixes: Vec<String>,
    pub parse_time_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub execution_time_ms: f64,
    /// The context the formula ran against, echoed for audit trails.
    pub context: FormulaContext,
}

impl ValidationResult {
    /// Serialize for the formula-editing UI.
    pub fn to_json(&self) -> crate::common::Result<String> {
        serde_json::to_string(self).map_err(|err| {
            crate::common::Error::new(
                crate::common::ErrorKind::Validation,
                ErrorCode::Generic,
                Some(format!("failed to serialize validation result: {err}")),
            )
        })
    }
}

impl ExecutionResult {
    /// Serialize for the scoring pipeline.
    pub fn to_json(&self) -> crate::common::Result<String> {
        serde_json::to_string(self).map_err(|err| {
            crate::common::Error::new(
                crate::common::ErrorKind::Evaluation,
                ErrorCode::Generic,
                Some(format!("failed to serialize execution result: {err}")),
            )
        })
    }
}

/// The callee part of a call diagnostic's source slice: the span covers
/// the whole call, the message wants just the name.
fn call_name(lexeme: &str) -> &str {
    lexeme.split('(').next().unwrap_or(lexeme)
}

fn describe(err: &FormulaError, input: &str) -> String {
    let lexeme = input
        .get(err.start as usize..err.end as usize)
        .unwrap_or("");
    match err.code {
        ErrorCode::EmptyFormula => "formula cannot be empty".to_string(),
        ErrorCode::InvalidToken if lexeme == "=" => {
            "unexpected character '='; use '==' to compare".to_string()
        }
        ErrorCode::InvalidToken => format!("unexpected character '{lexeme}'"),
        ErrorCode::UnclosedString => "string is missing its closing quote".to_string(),
        ErrorCode::MalformedNumber => format!("'{lexeme}' is not a valid number"),
        ErrorCode::UnrecognizedEof => "unexpected end of formula".to_string(),
        ErrorCode::UnrecognizedToken => format!("unexpected '{lexeme}'"),
        ErrorCode::ExtraToken => format!("unexpected '{lexeme}' after the expression"),
        ErrorCode::UnclosedParen => "missing closing parenthesis ')'".to_string(),
        ErrorCode::ExpectedLParen => {
            format!("expected '(' after function name '{lexeme}'")
        }
        ErrorCode::UnknownFunction => {
            format!("unknown function '{}'", call_name(lexeme))
        }
        ErrorCode::BadFunctionArgs => {
            format!("wrong number of arguments to '{}'", call_name(lexeme))
        }
        ErrorCode::NoError | ErrorCode::Generic | ErrorCode::UnknownOperator => {
            err.code.to_string()
        }
    }
}

fn diagnostic(err: &FormulaError, input: &str, severity: Severity) -> Diagnostic {
    // the empty-formula diagnostic has nothing to point at
    let position = if err.code == ErrorCode::EmptyFormula {
        None
    } else {
        Some(Loc::new(err.start as usize, err.end as usize))
    };
    Diagnostic {
        kind: err.code,
        message: describe(err, input),
        position,
        severity,
    }
}

/// Validate a formula without executing it: tokenize, parse with error
/// recovery, then check call names and arities against the registries.
/// Every problem in the formula is reported in one pass.
pub fn validate_formula(input: &str) -> ValidationResult {
    let start = Instant::now();

    let output = parser::parse_partial(input);
    let mut errors: Vec<Diagnostic> = output
        .errors
        .iter()
        .map(|err| diagnostic(err, input, Severity::Error))
        .collect();
    let mut warnings: Vec<Diagnostic> = output
        .warnings
        .iter()
        .map(|err| diagnostic(err, input, Severity::Warning))
        .collect();

    if let Some(ast) = &output.ast {
        let checked = validator::check(ast);
        errors.extend(
            checked
                .errors
                .iter()
                .map(|err| diagnostic(err, input, Severity::Error)),
        );
        warnings.extend(
            checked
                .warnings
                .iter()
                .map(|err| diagnostic(err, input, Severity::Warning)),
        );
    }

    let mut suggested_fixes: Vec<String> = Vec::new();
    for diag in errors.iter().chain(warnings.iter()) {
        if let Some(fix) = diag.kind.suggested_fix() {
            if !suggested_fixes.iter().any(|f| f == fix) {
                suggested_fixes.push(fix.to_string());
            }
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        suggested_fixes,
        parse_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

/// Validate and then evaluate a formula against `ctx`.  Never panics and
/// never returns an unstructured failure: anything that goes wrong lands
/// in `success: false` with a human-readable message.
pub fn execute_formula(input: &str, ctx: &FormulaContext) -> ExecutionResult {
    let start = Instant::now();
    let failure = |error: String| ExecutionResult {
        success: false,
        result: None,
        error: Some(error),
        execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        context: ctx.clone(),
    };

    let validation = validate_formula(input);
    if !validation.is_valid {
        let message = validation
            .errors
            .first()
            .map(|diag| diag.message.clone())
            .unwrap_or_else(|| "invalid formula".to_string());
        return failure(message);
    }

    // validation passed, so the strict parse yields a tree
    let expr = match parser::parse(input) {
        Ok(expr) => expr,
        Err(errs) => {
            let message = errs
                .first()
                .map(|err| describe(err, input))
                .unwrap_or_else(|| "invalid formula".to_string());
            return failure(message);
        }
    };

    match Evaluator::new(ctx).eval(&expr) {
        Ok(value) => ExecutionResult {
            success: true,
            result: Some(value),
            error: None,
            execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            context: ctx.clone(),
        },
        Err(err) => {
            let message = err.get_details().unwrap_or_else(|| err.to_string());
            failure(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ok() {
        let result = validate_formula("1 + 2 * 3");
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.suggested_fixes.is_empty());
        assert!(result.parse_time_ms >= 0.0);
    }

    #[test]
    fn test_validate_missing_close_paren() {
        let input = "dimension(\"fluency\"";
        let result = validate_formula(input);
        assert!(!result.is_valid);
        assert_eq!(1, result.errors.len());

        let diag = &result.errors[0];
        assert_eq!(ErrorCode::UnclosedParen, diag.kind);
        // positioned at the end of the input, and the message names the
        // missing ')'
        assert_eq!(Some(Loc::new(input.len(), input.len() + 1)), diag.position);
        assert!(diag.message.contains(")"), "{}", diag.message);
        assert!(
            result
                .suggested_fixes
                .iter()
                .any(|fix| fix.contains("parentheses"))
        );
    }

    #[test]
    fn test_validate_unknown_function() {
        let result = validate_formula("boom(1)");
        assert!(!result.is_valid);
        assert_eq!(ErrorCode::UnknownFunction, result.errors[0].kind);
        assert_eq!("unknown function 'boom'", result.errors[0].message);
        assert_eq!(
            vec!["check function name spelling".to_string()],
            result.suggested_fixes
        );
    }

    #[test]
    fn test_validate_empty() {
        for input in ["", "   ", "\t\n"] {
            let result = validate_formula(input);
            assert!(!result.is_valid);
            assert_eq!(1, result.errors.len());
            assert_eq!(ErrorCode::EmptyFormula, result.errors[0].kind);
            assert_eq!(None, result.errors[0].position);
            assert_eq!("formula cannot be empty", result.errors[0].message);
        }
    }

    #[test]
    fn test_validate_warnings_do_not_invalidate() {
        let result = validate_formula("\"abc");
        assert!(result.is_valid);
        assert_eq!(1, result.warnings.len());
        assert_eq!(ErrorCode::UnclosedString, result.warnings[0].kind);
        assert_eq!(Severity::Warning, result.warnings[0].severity);

        let result = validate_formula("abs(1, 2)");
        assert!(result.is_valid);
        assert_eq!(ErrorCode::BadFunctionArgs, result.warnings[0].kind);
        assert_eq!("wrong number of arguments to 'abs'", result.warnings[0].message);
    }

    #[test]
    fn test_validate_reports_every_error() {
        let result = validate_formula("= = 2");
        let kinds: Vec<ErrorCode> = result.errors.iter().map(|d| d.kind).collect();
        assert_eq!(
            vec![
                ErrorCode::InvalidToken,
                ErrorCode::InvalidToken,
                ErrorCode::ExtraToken
            ],
            kinds
        );
    }

    #[test]
    fn test_validate_lone_equals_suggests_double() {
        let result = validate_formula("a = 1");
        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("=="));
    }

    #[test]
    fn test_execute_simple() {
        let result = execute_formula("1 + 2", &FormulaContext::new());
        assert!(result.success);
        assert_eq!(Some(Value::Number(3.0)), result.result);
        assert_eq!(None, result.error);
        assert!(result.execution_time_ms >= 0.0);
    }

    #[test]
    fn test_execute_weighted_score() {
        let mut ctx = FormulaContext::new();
        ctx.dimensions.insert("fluency".to_string(), 85.0);
        ctx.dimensions.insert("adequacy".to_string(), 90.0);
        ctx.weights.insert("fluency".to_string(), 40.0);
        ctx.weights.insert("adequacy".to_string(), 60.0);

        let formula = "(dimension(\"fluency\") * weight(\"fluency\") \
                       + dimension(\"adequacy\") * weight(\"adequacy\")) \
                       / (weight(\"fluency\") + weight(\"adequacy\"))";
        let result = execute_formula(formula, &ctx);
        assert!(result.success, "{:?}", result.error);
        assert_eq!(Some(Value::Number(88.0)), result.result);
    }

    #[test]
    fn test_execute_error_penalties() {
        let mut ctx = FormulaContext::new();
        ctx.error_types.insert("minor".to_string(), 2.0);
        ctx.error_types.insert("major".to_string(), 1.0);
        ctx.error_types.insert("critical".to_string(), 0.0);

        let formula = "errorType(\"minor\") * 1 + errorType(\"major\") * 5 \
                       + errorType(\"critical\") * 10";
        let result = execute_formula(formula, &ctx);
        assert!(result.success);
        assert_eq!(Some(Value::Number(7.0)), result.result);
    }

    #[test]
    fn test_execute_invalid_formula() {
        let result = execute_formula("1 +", &FormulaContext::new());
        assert!(!result.success);
        assert_eq!(None, result.result);
        assert_eq!(Some("unexpected end of formula".to_string()), result.error);
    }

    #[test]
    fn test_execute_unknown_function() {
        let result = execute_formula("boom(1)", &FormulaContext::new());
        assert!(!result.success);
        assert_eq!(Some("unknown function 'boom'".to_string()), result.error);
    }

    #[test]
    fn test_execute_echoes_context() {
        let mut ctx = FormulaContext::new();
        ctx.max_score = 100.0;
        ctx.variables.insert("x".to_string(), 5.0);

        let result = execute_formula("x * 2", &ctx);
        assert!(result.success);
        assert_eq!(Some(Value::Number(10.0)), result.result);
        assert_eq!(ctx, result.context);
    }

    #[test]
    fn test_validation_result_serializes_camel_case() {
        let result = validate_formula("boom(1)");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(false, json["isValid"]);
        assert_eq!("unknown_function", json["errors"][0]["kind"]);
        assert_eq!("error", json["errors"][0]["severity"]);
        assert_eq!(0, json["errors"][0]["position"]["start"]);
        assert!(json["parseTimeMs"].is_number());
        assert!(json["suggestedFixes"].is_array());
    }

    #[test]
    fn test_execution_result_serializes_camel_case() {
        let result = execute_formula("2 ^ 10", &FormulaContext::new());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(true, json["success"]);
        assert_eq!(1024.0, json["result"]);
        assert!(json["executionTimeMs"].is_number());
        assert!(json["context"]["totalErrors"].is_number());
    }

    #[test]
    fn test_to_json() {
        let json = validate_formula("1 + 2").to_json().unwrap();
        assert!(json.contains("\"isValid\":true"));

        let json = execute_formula("1 + 2", &FormulaContext::new())
            .to_json()
            .unwrap();
        assert!(json.contains("\"result\":3.0"));
    }
}
