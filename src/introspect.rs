// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Listing what a formula refers to, for editor autocomplete and for
//! building evaluation contexts.  Works straight off the token stream,
//! so it tolerates formulas that do not parse.

use crate::token::{TokenKind, tokenize};

/// Every distinct identifier referenced by the formula, in first-seen
/// order.  Variable names are case-sensitive, so `x` and `X` are two
/// entries.
pub fn extract_variables(input: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for tok in tokenize(input) {
        if tok.kind == TokenKind::Identifier && !seen.iter().any(|s| s == tok.lexeme) {
            seen.push(tok.lexeme.to_string());
        }
    }
    seen
}

/// Every distinct function referenced by the formula, in first-seen
/// order.  Function names are case-insensitive; the first spelling that
/// appears is the one kept.
pub fn extract_functions(input: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for tok in tokenize(input) {
        if tok.kind == TokenKind::Function
            && !seen.iter().any(|s| s.eq_ignore_ascii_case(tok.lexeme))
        {
            seen.push(tok.lexeme.to_string());
        }
    }
    seen
}

#[test]
fn test_extract_variables() {
    assert_eq!(vec!["a", "b"], extract_variables("a + b * a"));
    assert_eq!(
        vec!["errorWeight", "unknownVar"],
        extract_variables("dimension(\"fluency\") * errorWeight + unknownVar")
    );
    // case-sensitive: both spellings are distinct variables
    assert_eq!(vec!["x", "X"], extract_variables("x + X"));
    assert!(extract_variables("1 + 2").is_empty());
}

#[test]
fn test_extract_variables_skips_strings_and_functions() {
    assert_eq!(vec!["x"], extract_variables("\"abc\" + x"));
    assert_eq!(vec!["x"], extract_variables("min(x, 2)"));
}

#[test]
fn test_extract_functions() {
    assert_eq!(vec!["min", "max"], extract_functions("min(1, max(2, 3))"));
    // case-insensitive dedup keeps the first spelling
    assert_eq!(vec!["MIN"], extract_functions("MIN(1) + min(2)"));
    assert!(extract_functions("a + b").is_empty());
}

#[test]
fn test_extract_tolerates_invalid_input() {
    // unknown callees are identifiers, not functions
    assert_eq!(vec!["foo"], extract_variables("foo( @# $"));
    assert!(extract_functions("@#$ 1.2.3 \"unclosed").is_empty());
    assert!(extract_variables("").is_empty());
}
