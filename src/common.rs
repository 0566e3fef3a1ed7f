// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use serde::Serialize;

/// An identifier as written in a formula, e.g. a variable name.
pub type Ident = String;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NoError, // will never be produced
    Generic,
    EmptyFormula,
    InvalidToken,
    UnclosedString,
    MalformedNumber,
    UnrecognizedEof,
    UnrecognizedToken,
    ExtraToken,
    UnclosedParen,
    ExpectedLParen,
    UnknownFunction,
    BadFunctionArgs,
    UnknownOperator,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            Generic => "generic",
            EmptyFormula => "empty_formula",
            InvalidToken => "invalid_token",
            UnclosedString => "unclosed_string",
            MalformedNumber => "malformed_number",
            UnrecognizedEof => "unrecognized_eof",
            UnrecognizedToken => "unrecognized_token",
            ExtraToken => "extra_token",
            UnclosedParen => "unclosed_paren",
            ExpectedLParen => "expected_lparen",
            UnknownFunction => "unknown_function",
            BadFunctionArgs => "bad_function_args",
            UnknownOperator => "unknown_operator",
        };

        write!(f, "{name}")
    }
}

impl ErrorCode {
    /// The fix string surfaced to formula editors alongside this code,
    /// where one is derivable.
    pub fn suggested_fix(&self) -> Option<&'static str> {
        use ErrorCode::*;
        let fix = match self {
            EmptyFormula => "enter a formula",
            InvalidToken => "remove or replace the unrecognized character",
            UnclosedString => "add a closing quote",
            MalformedNumber => "use a number with a single decimal point",
            UnrecognizedToken | UnrecognizedEof | UnclosedParen | ExpectedLParen | ExtraToken => {
                "check for missing parentheses or commas"
            }
            UnknownFunction => "check function name spelling",
            BadFunctionArgs => "check the number of function arguments",
            _ => return None,
        };
        Some(fix)
    }
}

/// An error at a specific span of the formula source text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormulaError {
    pub start: u16,
    pub end: u16,
    pub code: ErrorCode,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.code)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Evaluation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Evaluation => "EvaluationError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

impl From<FormulaError> for Error {
    fn from(err: FormulaError) -> Self {
        Error {
            kind: ErrorKind::Validation,
            code: err.code,
            details: None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! eval_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Evaluation,
            ErrorCode::$code,
            Some($str),
        ))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Evaluation, ErrorCode::$code, None))
    }};
}

#[test]
fn test_error_code_display() {
    assert_eq!("unknown_function", format!("{}", ErrorCode::UnknownFunction));
    assert_eq!("empty_formula", format!("{}", ErrorCode::EmptyFormula));
    assert_eq!("unclosed_paren", format!("{}", ErrorCode::UnclosedParen));
}

#[test]
fn test_formula_error_display() {
    let err = FormulaError {
        start: 3,
        end: 7,
        code: ErrorCode::MalformedNumber,
    };
    assert_eq!("3:7:malformed_number", format!("{err}"));
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Evaluation,
        ErrorCode::UnknownFunction,
        Some("no function 'boom'".to_owned()),
    );
    assert_eq!(
        "EvaluationError{unknown_function: no function 'boom'}",
        format!("{err}")
    );
    let err = Error::new(ErrorKind::Validation, ErrorCode::Generic, None);
    assert_eq!("ValidationError{generic}", format!("{err}"));
}

#[test]
fn test_suggested_fixes() {
    assert_eq!(
        Some("check function name spelling"),
        ErrorCode::UnknownFunction.suggested_fix()
    );
    assert_eq!(
        Some("check for missing parentheses or commas"),
        ErrorCode::UnclosedParen.suggested_fix()
    );
    assert_eq!(None, ErrorCode::NoError.suggested_fix());
}
