// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

mod ast;
mod builtins;
pub mod common;
mod context;
mod engine;
mod interpreter;
mod introspect;
mod parser;
mod token;
mod validator;
mod value;

pub use self::ast::{BinaryOp, Expr, Loc, UnaryOp};
pub use self::builtins::is_builtin_fn;
pub use self::common::{Error, ErrorCode, ErrorKind, FormulaError, Ident, Result};
pub use self::context::FormulaContext;
pub use self::engine::{
    Diagnostic, ExecutionResult, Severity, ValidationResult, execute_formula, validate_formula,
};
pub use self::introspect::{extract_functions, extract_variables};
pub use self::parser::{ParseOutput, parse, parse_partial};
pub use self::token::{Token, TokenKind, tokenize};
pub use self::value::Value;
