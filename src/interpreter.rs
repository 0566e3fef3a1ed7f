// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Tree-walking evaluator.
//!
//! Evaluation is total over well-formed trees: unknown identifiers read
//! as zero, division and modulo by zero yield zero, and every builtin
//! implementation handles whatever argument values reach it.  The only
//! runtime error is a call to a name outside both registries, which
//! validation catches first in the normal path.

use smallvec::SmallVec;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::builtins;
use crate::common::Result;
use crate::context::FormulaContext;
use crate::eval_err;
use crate::value::Value;

pub struct Evaluator<'a> {
    ctx: &'a FormulaContext,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a FormulaContext) -> Self {
        Evaluator { ctx }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Const(_, n, _) => Ok(Value::Number(*n)),
            Expr::Str(s, _) => Ok(Value::Str(s.clone())),
            Expr::Var(id, _) => {
                // variables shadow constants; anything undefined is zero
                let n = self
                    .ctx
                    .variables
                    .get(id)
                    .or_else(|| self.ctx.constants.get(id))
                    .copied()
                    .unwrap_or(0.0);
                Ok(Value::Number(n))
            }
            Expr::If(cond, t, f, _) => {
                // the conditional is the one construct that short-circuits
                if self.eval(cond)?.is_truthy() {
                    self.eval(t)
                } else {
                    self.eval(f)
                }
            }
            Expr::Op1(op, operand, _) => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Positive => Value::Number(operand.as_number()),
                    UnaryOp::Negative => Value::Number(-operand.as_number()),
                    UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                })
            }
            Expr::Op2(op, l, r, _) => {
                // both operands always evaluate, && and || included
                let l = self.eval(l)?;
                let r = self.eval(r)?;
                Ok(eval_op2(*op, l, r))
            }
            Expr::App(name, args, _) => {
                let mut vals: SmallVec<[Value; 4]> = SmallVec::new();
                for arg in args {
                    vals.push(self.eval(arg)?);
                }
                if let Some(func) = builtins::math_fn(name) {
                    Ok(func(&vals))
                } else if let Some(func) = builtins::scoring_fn(name) {
                    Ok(func(self.ctx, &vals))
                } else {
                    eval_err!(UnknownFunction, format!("no function '{name}'"))
                }
            }
        }
    }
}

fn eval_op2(op: BinaryOp, l: Value, r: Value) -> Value {
    match op {
        BinaryOp::Add => {
            // `+` concatenates when either side is a string
            if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                Value::Str(format!("{l}{r}"))
            } else {
                Value::Number(l.as_number() + r.as_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.as_number() - r.as_number()),
        BinaryOp::Mul => Value::Number(l.as_number() * r.as_number()),
        BinaryOp::Div => {
            let r = r.as_number();
            if r == 0.0 {
                Value::Number(0.0)
            } else {
                Value::Number(l.as_number() / r)
            }
        }
        BinaryOp::Mod => {
            let r = r.as_number();
            if r == 0.0 {
                Value::Number(0.0)
            } else {
                Value::Number(l.as_number() % r)
            }
        }
        BinaryOp::Exp => Value::Number(l.as_number().powf(r.as_number())),
        BinaryOp::Gt => Value::Bool(l.as_number() > r.as_number()),
        BinaryOp::Lt => Value::Bool(l.as_number() < r.as_number()),
        BinaryOp::Gte => Value::Bool(l.as_number() >= r.as_number()),
        BinaryOp::Lte => Value::Bool(l.as_number() <= r.as_number()),
        BinaryOp::Eq => Value::Bool(l.loose_eq(&r)),
        BinaryOp::Neq => Value::Bool(!l.loose_eq(&r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(&r)),
        BinaryOp::StrictNeq => Value::Bool(!l.strict_eq(&r)),
        BinaryOp::And => Value::Bool(l.is_truthy() && r.is_truthy()),
        BinaryOp::Or => Value::Bool(l.is_truthy() || r.is_truthy()),
    }
}
