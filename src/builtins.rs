// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The whitelist registries: the fixed tables of function names a formula
//! may call, and their implementations.  This is the sole mechanism
//! preventing arbitrary code execution; if a name is not here, it cannot
//! be called.
//!
//! Math functions are pure over their arguments.  Scoring functions
//! additionally receive the read-only [`FormulaContext`].  Every
//! implementation is total: missing arguments read as zero, extra
//! arguments are ignored (the validator warns about arity separately).

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::context::FormulaContext;
use crate::value::Value;

pub type MathFn = fn(&[Value]) -> Value;
pub type ScoringFn = fn(&FormulaContext, &[Value]) -> Value;

pub struct FnDef<F> {
    pub func: F,
    pub min_args: usize,
    /// None means variadic.
    pub max_args: Option<usize>,
}

fn num(args: &[Value], i: usize) -> f64 {
    args.get(i).map(Value::as_number).unwrap_or(0.0)
}

fn num_or(args: &[Value], i: usize, default: f64) -> f64 {
    args.get(i).map(Value::as_number).unwrap_or(default)
}

fn truthy(args: &[Value], i: usize) -> bool {
    args.get(i).map(Value::is_truthy).unwrap_or(false)
}

// map keys come from string arguments; non-string arguments fall back to
// their display form so dimension(1) looks up "1"
fn key(args: &[Value], i: usize) -> String {
    match args.get(i) {
        Some(Value::Str(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn lookup(map: &HashMap<String, f64>, args: &[Value]) -> Value {
    Value::Number(map.get(&key(args, 0)).copied().unwrap_or(0.0))
}

mod math {
    use super::*;

    pub(super) fn abs(args: &[Value]) -> Value {
        Value::Number(num(args, 0).abs())
    }

    pub(super) fn ceil(args: &[Value]) -> Value {
        Value::Number(num(args, 0).ceil())
    }

    pub(super) fn floor(args: &[Value]) -> Value {
        Value::Number(num(args, 0).floor())
    }

    pub(super) fn round(args: &[Value]) -> Value {
        Value::Number(num(args, 0).round())
    }

    pub(super) fn sqrt(args: &[Value]) -> Value {
        Value::Number(num(args, 0).sqrt())
    }

    pub(super) fn pow(args: &[Value]) -> Value {
        Value::Number(num(args, 0).powf(num(args, 1)))
    }

    pub(super) fn log(args: &[Value]) -> Value {
        Value::Number(num(args, 0).ln())
    }

    pub(super) fn log10(args: &[Value]) -> Value {
        Value::Number(num(args, 0).log10())
    }

    pub(super) fn min(args: &[Value]) -> Value {
        if args.is_empty() {
            return Value::Number(0.0);
        }
        Value::Number(
            args.iter()
                .map(Value::as_number)
                .fold(f64::INFINITY, f64::min),
        )
    }

    pub(super) fn max(args: &[Value]) -> Value {
        if args.is_empty() {
            return Value::Number(0.0);
        }
        Value::Number(
            args.iter()
                .map(Value::as_number)
                .fold(f64::NEG_INFINITY, f64::max),
        )
    }

    pub(super) fn sum(args: &[Value]) -> Value {
        Value::Number(args.iter().map(Value::as_number).sum())
    }

    pub(super) fn avg(args: &[Value]) -> Value {
        if args.is_empty() {
            return Value::Number(0.0);
        }
        let total: f64 = args.iter().map(Value::as_number).sum();
        Value::Number(total / args.len() as f64)
    }

    pub(super) fn count(args: &[Value]) -> Value {
        Value::Number(args.len() as f64)
    }

    // the three-argument call is normally rewritten to a conditional node
    // at parse time; this eager form only runs for mismatched arities
    pub(super) fn if_(args: &[Value]) -> Value {
        if truthy(args, 0) {
            args.get(1).cloned().unwrap_or(Value::Number(0.0))
        } else {
            args.get(2).cloned().unwrap_or(Value::Number(0.0))
        }
    }

    pub(super) fn and(args: &[Value]) -> Value {
        Value::Bool(args.iter().all(Value::is_truthy))
    }

    pub(super) fn or(args: &[Value]) -> Value {
        Value::Bool(args.iter().any(Value::is_truthy))
    }

    pub(super) fn not(args: &[Value]) -> Value {
        Value::Bool(!truthy(args, 0))
    }

    pub(super) fn clamp(args: &[Value]) -> Value {
        let x = num(args, 0);
        let lo = num(args, 1);
        let hi = num(args, 2);
        Value::Number(x.max(lo).min(hi))
    }

    pub(super) fn between(args: &[Value]) -> Value {
        let x = num(args, 0);
        Value::Bool(num(args, 1) <= x && x <= num(args, 2))
    }

    pub(super) fn to_fixed(args: &[Value]) -> Value {
        let x = num(args, 0);
        let digits = num(args, 1).clamp(0.0, 20.0) as usize;
        Value::Str(format!("{x:.digits$}"))
    }

    pub(super) fn to_precision(args: &[Value]) -> Value {
        let x = num(args, 0);
        // a NaN digit count survives clamp and must not reach the cast
        let s = num_or(args, 1, 6.0);
        let sig = if s.is_nan() { 6 } else { s.clamp(1.0, 21.0) as i32 };
        if !x.is_finite() {
            return Value::Str(x.to_string());
        }
        if x == 0.0 {
            return Value::Str(format!("{:.*}", (sig - 1) as usize, 0.0));
        }
        // round to `sig` significant digits, then render plainly
        let magnitude = x.abs().log10().floor() as i32 + 1;
        let decimals = (sig - magnitude).max(0) as usize;
        let scale = 10f64.powi(sig - magnitude);
        if !scale.is_finite() {
            // values near the bottom of the f64 range overflow the scale
            // factor; fixed formatting rounds at the same digit
            return Value::Str(format!("{x:.decimals$}"));
        }
        let rounded = (x * scale).round() / scale;
        Value::Str(format!("{rounded:.decimals$}"))
    }
}

mod scoring {
    use super::*;

    pub(super) fn dimension(ctx: &FormulaContext, args: &[Value]) -> Value {
        lookup(&ctx.dimensions, args)
    }

    pub(super) fn error_type(ctx: &FormulaContext, args: &[Value]) -> Value {
        lookup(&ctx.error_types, args)
    }

    pub(super) fn weight(ctx: &FormulaContext, args: &[Value]) -> Value {
        lookup(&ctx.weights, args)
    }

    pub(super) fn constant(ctx: &FormulaContext, args: &[Value]) -> Value {
        lookup(&ctx.constants, args)
    }

    pub(super) fn variable(ctx: &FormulaContext, args: &[Value]) -> Value {
        lookup(&ctx.variables, args)
    }

    pub(super) fn total_errors(ctx: &FormulaContext, _args: &[Value]) -> Value {
        Value::Number(ctx.total_errors)
    }

    pub(super) fn unit_count(ctx: &FormulaContext, _args: &[Value]) -> Value {
        Value::Number(ctx.unit_count)
    }

    pub(super) fn error_rate(ctx: &FormulaContext, _args: &[Value]) -> Value {
        Value::Number(ctx.error_rate)
    }

    pub(super) fn max_score(ctx: &FormulaContext, _args: &[Value]) -> Value {
        Value::Number(ctx.max_score)
    }

    pub(super) fn passing_threshold(ctx: &FormulaContext, _args: &[Value]) -> Value {
        Value::Number(ctx.passing_threshold)
    }

    pub(super) fn percentage(_ctx: &FormulaContext, args: &[Value]) -> Value {
        let value = num(args, 0);
        let total = num(args, 1);
        if total == 0.0 {
            Value::Number(0.0)
        } else {
            Value::Number(value / total * 100.0)
        }
    }

    pub(super) fn percentage_of(_ctx: &FormulaContext, args: &[Value]) -> Value {
        Value::Number(num(args, 0) * num(args, 1) / 100.0)
    }

    pub(super) fn quality_level(_ctx: &FormulaContext, args: &[Value]) -> Value {
        let score = num(args, 0);
        let excellent = num_or(args, 1, 90.0);
        let good = num_or(args, 2, 75.0);
        let fair = num_or(args, 3, 60.0);
        let level = if score >= excellent {
            "excellent"
        } else if score >= good {
            "good"
        } else if score >= fair {
            "fair"
        } else {
            "poor"
        };
        Value::Str(level.to_string())
    }
}

lazy_static! {
    static ref MATH_FUNCTIONS: HashMap<&'static str, FnDef<MathFn>> = {
        fn def(func: MathFn, min_args: usize, max_args: Option<usize>) -> FnDef<MathFn> {
            FnDef {
                func,
                min_args,
                max_args,
            }
        }
        let mut m = HashMap::new();
        m.insert("abs", def(math::abs, 1, Some(1)));
        m.insert("ceil", def(math::ceil, 1, Some(1)));
        m.insert("floor", def(math::floor, 1, Some(1)));
        m.insert("round", def(math::round, 1, Some(1)));
        m.insert("sqrt", def(math::sqrt, 1, Some(1)));
        m.insert("pow", def(math::pow, 2, Some(2)));
        m.insert("log", def(math::log, 1, Some(1)));
        m.insert("log10", def(math::log10, 1, Some(1)));
        m.insert("min", def(math::min, 1, None));
        m.insert("max", def(math::max, 1, None));
        m.insert("avg", def(math::avg, 1, None));
        m.insert("sum", def(math::sum, 1, None));
        m.insert("count", def(math::count, 0, None));
        m.insert("if", def(math::if_, 3, Some(3)));
        m.insert("and", def(math::and, 1, None));
        m.insert("or", def(math::or, 1, None));
        m.insert("not", def(math::not, 1, Some(1)));
        m.insert("clamp", def(math::clamp, 3, Some(3)));
        m.insert("between", def(math::between, 3, Some(3)));
        m.insert("tofixed", def(math::to_fixed, 1, Some(2)));
        m.insert("toprecision", def(math::to_precision, 1, Some(2)));
        m
    };
    static ref SCORING_FUNCTIONS: HashMap<&'static str, FnDef<ScoringFn>> = {
        fn def(func: ScoringFn, min_args: usize, max_args: Option<usize>) -> FnDef<ScoringFn> {
            FnDef {
                func,
                min_args,
                max_args,
            }
        }
        let mut m = HashMap::new();
        m.insert("dimension", def(scoring::dimension, 1, Some(1)));
        m.insert("errortype", def(scoring::error_type, 1, Some(1)));
        m.insert("weight", def(scoring::weight, 1, Some(1)));
        m.insert("constant", def(scoring::constant, 1, Some(1)));
        m.insert("variable", def(scoring::variable, 1, Some(1)));
        m.insert("totalerrors", def(scoring::total_errors, 0, Some(0)));
        m.insert("unitcount", def(scoring::unit_count, 0, Some(0)));
        m.insert("errorrate", def(scoring::error_rate, 0, Some(0)));
        m.insert("maxscore", def(scoring::max_score, 0, Some(0)));
        m.insert("passingthreshold", def(scoring::passing_threshold, 0, Some(0)));
        m.insert("percentage", def(scoring::percentage, 2, Some(2)));
        m.insert("percentageof", def(scoring::percentage_of, 2, Some(2)));
        m.insert("qualitylevel", def(scoring::quality_level, 1, Some(4)));
        m
    };
}

pub fn is_math_fn(name: &str) -> bool {
    MATH_FUNCTIONS.contains_key(name.to_lowercase().as_str())
}

pub fn is_scoring_fn(name: &str) -> bool {
    SCORING_FUNCTIONS.contains_key(name.to_lowercase().as_str())
}

/// Whether `name` is callable at all.  Case-insensitive; this is what the
/// tokenizer uses to classify Function tokens.
pub fn is_builtin_fn(name: &str) -> bool {
    is_math_fn(name) || is_scoring_fn(name)
}

pub(crate) fn math_fn(name: &str) -> Option<MathFn> {
    MATH_FUNCTIONS
        .get(name.to_lowercase().as_str())
        .map(|def| def.func)
}

pub(crate) fn scoring_fn(name: &str) -> Option<ScoringFn> {
    SCORING_FUNCTIONS
        .get(name.to_lowercase().as_str())
        .map(|def| def.func)
}

/// (min_args, max_args) for a builtin, None for unknown names.
pub(crate) fn arity(name: &str) -> Option<(usize, Option<usize>)> {
    let name = name.to_lowercase();
    MATH_FUNCTIONS
        .get(name.as_str())
        .map(|def| (def.min_args, def.max_args))
        .or_else(|| {
            SCORING_FUNCTIONS
                .get(name.as_str())
                .map(|def| (def.min_args, def.max_args))
        })
}

#[test]
fn test_is_builtin_fn() {
    assert!(is_builtin_fn("abs"));
    assert!(is_builtin_fn("min"));
    assert!(is_builtin_fn("if"));
    assert!(is_builtin_fn("toFixed"));
    assert!(is_builtin_fn("dimension"));
    assert!(is_builtin_fn("errorType"));
    assert!(is_builtin_fn("totalErrors"));
    assert!(is_builtin_fn("qualityLevel"));
    assert!(is_builtin_fn("PERCENTAGE"));

    assert!(!is_builtin_fn("foo"));
    assert!(!is_builtin_fn("lookup"));
    assert!(!is_builtin_fn("eval"));
    assert!(!is_builtin_fn(""));
}

#[test]
fn test_registries_are_disjoint() {
    for name in MATH_FUNCTIONS.keys() {
        assert!(!SCORING_FUNCTIONS.contains_key(name), "{name} in both");
    }
}

#[test]
fn test_arity() {
    assert_eq!(Some((1, Some(1))), arity("abs"));
    assert_eq!(Some((3, Some(3))), arity("clamp"));
    assert_eq!(Some((1, None)), arity("min"));
    assert_eq!(Some((0, Some(0))), arity("maxScore"));
    assert_eq!(Some((1, Some(4))), arity("qualityLevel"));
    assert_eq!(None, arity("foo"));
}

#[test]
fn test_variadic_math() {
    let args = vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
    assert_eq!(Value::Number(1.0), math::min(&args));
    assert_eq!(Value::Number(3.0), math::max(&args));
    assert_eq!(Value::Number(6.0), math::sum(&args));
    assert_eq!(Value::Number(2.0), math::avg(&args));
    assert_eq!(Value::Number(3.0), math::count(&args));

    assert_eq!(Value::Number(0.0), math::min(&[]));
    assert_eq!(Value::Number(0.0), math::max(&[]));
    assert_eq!(Value::Number(0.0), math::avg(&[]));
    assert_eq!(Value::Number(0.0), math::count(&[]));
}

#[test]
fn test_logic_math() {
    let t = Value::Number(1.0);
    let f = Value::Number(0.0);
    assert_eq!(Value::Bool(true), math::and(&[t.clone(), t.clone()]));
    assert_eq!(Value::Bool(false), math::and(&[t.clone(), f.clone()]));
    assert_eq!(Value::Bool(true), math::or(&[f.clone(), t.clone()]));
    assert_eq!(Value::Bool(false), math::or(&[f.clone(), f.clone()]));
    assert_eq!(Value::Bool(true), math::not(&[f]));
    assert_eq!(Value::Bool(false), math::not(&[t]));

    let b = |x: f64| math::between(&[Value::Number(x), Value::Number(1.0), Value::Number(10.0)]);
    assert_eq!(Value::Bool(true), b(5.0));
    assert_eq!(Value::Bool(true), b(10.0));
    assert_eq!(Value::Bool(false), b(11.0));
}

#[test]
fn test_string_returning_math() {
    assert_eq!(
        Value::Str("3.14".to_string()),
        math::to_fixed(&[Value::Number(3.14159), Value::Number(2.0)])
    );
    assert_eq!(
        Value::Str("3".to_string()),
        math::to_fixed(&[Value::Number(3.14159)])
    );
    assert_eq!(
        Value::Str("123.5".to_string()),
        math::to_precision(&[Value::Number(123.456), Value::Number(4.0)])
    );
    assert_eq!(
        Value::Str("0.0012".to_string()),
        math::to_precision(&[Value::Number(0.001234), Value::Number(2.0)])
    );
}

#[test]
fn test_formatting_nan_digit_counts() {
    // a NaN digit count falls back: toPrecision to its default of six
    // significant digits, toFixed to zero decimals
    assert_eq!(
        Value::Str("0.00000".to_string()),
        math::to_precision(&[Value::Number(0.0), Value::Number(f64::NAN)])
    );
    assert_eq!(
        Value::Str("123.456".to_string()),
        math::to_precision(&[Value::Number(123.456), Value::Number(f64::NAN)])
    );
    assert_eq!(
        Value::Str("5".to_string()),
        math::to_fixed(&[Value::Number(5.0), Value::Number(f64::NAN)])
    );
}

#[test]
fn test_to_precision_tiny_values() {
    match math::to_precision(&[Value::Number(2e-300), Value::Number(21.0)]) {
        Value::Str(s) => {
            assert!(s.starts_with("0.000"), "{s}");
            assert!(!s.contains("NaN"), "{s}");
        }
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn test_scoring_lookups() {
    let mut ctx = FormulaContext::new();
    ctx.dimensions.insert("fluency".to_string(), 85.0);
    ctx.weights.insert("fluency".to_string(), 40.0);
    ctx.max_score = 100.0;

    let arg = vec![Value::Str("fluency".to_string())];
    assert_eq!(Value::Number(85.0), scoring::dimension(&ctx, &arg));
    assert_eq!(Value::Number(40.0), scoring::weight(&ctx, &arg));
    assert_eq!(Value::Number(100.0), scoring::max_score(&ctx, &[]));

    // missing keys and unset scalars read as zero
    let missing = vec![Value::Str("nope".to_string())];
    assert_eq!(Value::Number(0.0), scoring::dimension(&ctx, &missing));
    assert_eq!(Value::Number(0.0), scoring::total_errors(&ctx, &[]));
}

#[test]
fn test_percentage() {
    let ctx = FormulaContext::new();
    assert_eq!(
        Value::Number(50.0),
        scoring::percentage(&ctx, &[Value::Number(5.0), Value::Number(10.0)])
    );
    // divide-by-zero guard
    assert_eq!(
        Value::Number(0.0),
        scoring::percentage(&ctx, &[Value::Number(5.0), Value::Number(0.0)])
    );
    assert_eq!(
        Value::Number(20.0),
        scoring::percentage_of(&ctx, &[Value::Number(25.0), Value::Number(80.0)])
    );
}

#[test]
fn test_quality_level() {
    let ctx = FormulaContext::new();
    let level = |score: f64| scoring::quality_level(&ctx, &[Value::Number(score)]);
    assert_eq!(Value::Str("excellent".to_string()), level(95.0));
    assert_eq!(Value::Str("excellent".to_string()), level(90.0));
    assert_eq!(Value::Str("good".to_string()), level(88.0));
    assert_eq!(Value::Str("fair".to_string()), level(60.0));
    assert_eq!(Value::Str("poor".to_string()), level(59.9));

    // custom thresholds
    assert_eq!(
        Value::Str("excellent".to_string()),
        scoring::quality_level(
            &ctx,
            &[Value::Number(50.0), Value::Number(40.0), Value::Number(30.0), Value::Number(20.0)]
        )
    );
}
