//! Expression evaluation.
//!
//! A tree walk over the parsed AST against a [`BindingContext`]. Evaluation
//! is total: missing identifiers, member access on `null`/`undefined`, and
//! type mismatches all produce `Undefined` rather than failing, because a
//! template that renders nothing beats a template that throws. Only parsing
//! can fail.
//!
//! Reads through tracked containers register dependencies as usual, which
//! is the whole point: evaluating a binding expression inside an effect
//! subscribes that effect to exactly the data the expression touched,
//! including, because `&&`/`||`/`?:` short-circuit, nothing from branches
//! not taken.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::ast::{BinaryOp, CompareOp, Expr, Literal, Spanned, UnaryOp};
use super::parser::parse;
use crate::error::Error;
use crate::value::Value;

/// The name scope an expression or path evaluates against.
///
/// `locals` hold loop-scoped variables (`aft-as`, `aft-index-as`) and
/// shadow `data` on collision. The binding layer pushes and pops locals per
/// iteration scope; both maps preserve insertion order.
#[derive(Debug, Clone, Default)]
pub struct BindingContext {
    data: IndexMap<String, Value>,
    locals: IndexMap<String, Value>,
}

impl BindingContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name in the data scope.
    pub fn insert_data(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(name.into(), value.into());
    }

    /// Bind a name in the loop-local scope, shadowing data.
    pub fn insert_local(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(name.into(), value.into());
    }

    /// Unbind a loop-local, returning its value if it was bound.
    pub fn remove_local(&mut self, name: &str) -> Option<Value> {
        self.locals.shift_remove(name)
    }

    /// Resolve a name: locals first, then data.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.data.get(name))
    }
}

/// Parse and evaluate an expression against `ctx`.
///
/// # Errors
///
/// Only syntax errors; see [`parse`]. A parsed expression always evaluates.
pub fn evaluate(source: &str, ctx: &BindingContext) -> Result<Value, Error> {
    let ast = parse(source)?;
    Ok(evaluate_parsed(&ast, ctx))
}

/// Evaluate an already-parsed expression. The binding layer parses each
/// attribute once and calls this per update.
pub fn evaluate_parsed(expr: &Spanned<Expr>, ctx: &BindingContext) -> Value {
    match &expr.node {
        Expr::Literal(literal) => literal_value(literal),
        Expr::Identifier(name) => ctx.lookup(name).cloned().unwrap_or(Value::Undefined),
        Expr::Member { object, property } => {
            let object = evaluate_parsed(object, ctx);
            read_member(&object, property)
        }
        Expr::Index { object, index } => {
            let object = evaluate_parsed(object, ctx);
            let index = evaluate_parsed(index, ctx);
            read_index(&object, &index)
        }
        Expr::Unary { op, operand } => {
            let operand = evaluate_parsed(operand, ctx);
            match op {
                UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                UnaryOp::Neg => Value::Number(-operand.to_number()),
            }
        }
        Expr::Binary { op, lhs, rhs } => match op {
            // `&&` / `||` return operand values and skip the untaken side.
            BinaryOp::And => {
                let lhs = evaluate_parsed(lhs, ctx);
                if lhs.is_truthy() {
                    evaluate_parsed(rhs, ctx)
                } else {
                    lhs
                }
            }
            BinaryOp::Or => {
                let lhs = evaluate_parsed(lhs, ctx);
                if lhs.is_truthy() {
                    lhs
                } else {
                    evaluate_parsed(rhs, ctx)
                }
            }
            BinaryOp::Add => evaluate_parsed(lhs, ctx).add(&evaluate_parsed(rhs, ctx)),
            BinaryOp::Sub => Value::Number(
                evaluate_parsed(lhs, ctx).to_number() - evaluate_parsed(rhs, ctx).to_number(),
            ),
            BinaryOp::Mul => Value::Number(
                evaluate_parsed(lhs, ctx).to_number() * evaluate_parsed(rhs, ctx).to_number(),
            ),
            BinaryOp::Div => Value::Number(
                evaluate_parsed(lhs, ctx).to_number() / evaluate_parsed(rhs, ctx).to_number(),
            ),
        },
        Expr::Comparison { op, lhs, rhs } => {
            let lhs = evaluate_parsed(lhs, ctx);
            let rhs = evaluate_parsed(rhs, ctx);
            let result = match op {
                CompareOp::Eq => lhs.loose_eq(&rhs),
                CompareOp::NotEq => !lhs.loose_eq(&rhs),
                CompareOp::Less => matches!(lhs.compare(&rhs), Some(Ordering::Less)),
                CompareOp::LessEq => {
                    matches!(lhs.compare(&rhs), Some(Ordering::Less | Ordering::Equal))
                }
                CompareOp::Greater => matches!(lhs.compare(&rhs), Some(Ordering::Greater)),
                CompareOp::GreaterEq => {
                    matches!(lhs.compare(&rhs), Some(Ordering::Greater | Ordering::Equal))
                }
            };
            Value::Bool(result)
        }
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate_parsed(condition, ctx).is_truthy() {
                evaluate_parsed(then_branch, ctx)
            } else {
                evaluate_parsed(else_branch, ctx)
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn read_member(object: &Value, property: &str) -> Value {
    match object {
        Value::Object(object) => object.get(property),
        // `length` mirrors the host language; list length is a
        // structure-tracked read.
        Value::List(list) if property == "length" => Value::Number(list.len() as f64),
        Value::Str(s) if property == "length" => Value::Number(s.chars().count() as f64),
        _ => Value::Undefined,
    }
}

fn read_index(object: &Value, index: &Value) -> Value {
    match object {
        Value::List(list) => {
            let n = index.to_number();
            if n.fract() == 0.0 && n >= 0.0 && n.is_finite() {
                list.get(n as usize)
            } else {
                Value::Undefined
            }
        }
        Value::Object(object) => match index {
            Value::Str(key) => object.get(key),
            Value::Number(_) => object.get(&index.to_string()),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}
