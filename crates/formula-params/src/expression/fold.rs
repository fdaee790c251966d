//! Constant folding.
//!
//! Operators, parenthesized expressions and sequence literals whose operands are all literals
//! collapse into a single [`Expr::Literal`]. Calls, fields, parameters and cells depend on the
//! runtime environment and never fold, though their arguments do.

use std::cmp::Ordering;

use crate::context::Context;
use crate::error::{ParamError, ParamResult};
use crate::expression::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;

pub(super) fn fold(expr: &mut Expr, ctx: &Context) -> ParamResult<()> {
    let folded = match expr {
        Expr::Literal(_) | Expr::Ident(_) | Expr::Field(_) | Expr::CurrentRow | Expr::Cell(_) => {
            None
        }
        Expr::Paren(inner) => {
            fold(inner, ctx)?;
            literal(inner).cloned()
        }
        Expr::Sequence(items) => {
            for item in items.iter_mut() {
                fold(item, ctx)?;
            }
            items
                .iter()
                .map(|item| literal(item).cloned())
                .collect::<Option<Vec<_>>>()
                .map(Value::Sequence)
        }
        Expr::Call { params, .. } => {
            if let Some(params) = params {
                params.optimize(ctx);
            }
            None
        }
        Expr::Member { target, .. } => {
            fold(target, ctx)?;
            None
        }
        Expr::MemberCall { target, params, .. } => {
            fold(target, ctx)?;
            if let Some(params) = params {
                params.optimize(ctx);
            }
            None
        }
        Expr::Unary { op, operand } => {
            fold(operand, ctx)?;
            match literal(operand) {
                Some(value) => Some(apply_unary(*op, value)?),
                None => None,
            }
        }
        Expr::Binary { op, left, right } => {
            fold(left, ctx)?;
            fold(right, ctx)?;
            match (literal(left), literal(right)) {
                (Some(l), Some(r)) => Some(apply_binary(*op, l, r)?),
                _ => None,
            }
        }
    };

    if let Some(value) = folded {
        *expr = Expr::Literal(value);
    }
    Ok(())
}

fn literal(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Literal(value) => Some(value),
        _ => None,
    }
}

fn type_error(op: &str, operands: &[&Value]) -> ParamError {
    let types: Vec<&str> = operands.iter().map(|v| v.type_name()).collect();
    ParamError::Eval(format!(
        "cannot apply {op} to {}",
        types.join(" and ")
    ))
}

fn apply_unary(op: UnaryOp, value: &Value) -> ParamResult<Value> {
    match (op, value) {
        (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Negate, other) => Err(type_error("-", &[other])),
        (UnaryOp::Not, other) => Err(type_error("!", &[other])),
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> ParamResult<Value> {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo => {
            let (Value::Number(l), Value::Number(r)) = (left, right) else {
                return Err(type_error(op.symbol(), &[left, right]));
            };
            let (l, r) = (*l, *r);
            let value = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Subtract => l - r,
                BinaryOp::Multiply => l * r,
                BinaryOp::Divide | BinaryOp::Modulo if r == 0.0 => {
                    return Err(ParamError::Eval("division by zero".into()));
                }
                BinaryOp::Divide => l / r,
                _ => l % r,
            };
            Ok(Value::Number(value))
        }
        BinaryOp::Concat => Ok(Value::Text(format!("{left}{right}"))),
        BinaryOp::Equals => Ok(Value::Bool(left == right)),
        BinaryOp::NotEquals => Ok(Value::Bool(left != right)),
        BinaryOp::Less | BinaryOp::LessEquals | BinaryOp::Greater | BinaryOp::GreaterEquals => {
            let ordering = compare(left, right)
                .ok_or_else(|| type_error(op.symbol(), &[left, right]))?;
            let result = match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEquals => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => {
            let (Value::Bool(l), Value::Bool(r)) = (left, right) else {
                return Err(type_error(op.symbol(), &[left, right]));
            };
            Ok(Value::Bool(if op == BinaryOp::And {
                *l && *r
            } else {
                *l || *r
            }))
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}
