//! Tree-walking evaluator.
//!
//! Name resolution is the sandbox. A bare identifier is either `inputs` or
//! `data`; a dotted chain rooted at a namespace (`Math.round`,
//! `$ui.pageContext.user.userid`) is looked up by name in `builtins`. Nothing
//! else is reachable.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use super::builtins::{self, NAMESPACES};
use super::value::{compare, display, index, loose_eq, number, property, strict_eq, to_number, truthy};
use crate::config::ConfigMap;
use crate::{Context, ExprError};

pub(crate) struct Evaluator<'a> {
    pub(crate) inputs: &'a ConfigMap,
    pub(crate) data: &'a ConfigMap,
    pub(crate) context: &'a Context,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(inputs: &'a ConfigMap, data: &'a ConfigMap, context: &'a Context) -> Self {
        Evaluator { inputs, data, context }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, ExprError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Array(items) => Ok(Value::Array(items.iter().map(|item| self.eval(item)).collect::<Result<_, _>>()?)),
            Expr::Ident(name) => self.identifier(name),
            Expr::Member { object, property: name } => match namespaced(expr) {
                Some(path) => builtins::constant(&path).ok_or(ExprError::UnknownIdentifier(path)),
                None => Ok(property(&self.eval(object)?, name)),
            },
            Expr::Index { object, index: key } => {
                let target = self.eval(object)?;
                Ok(index(&target, &self.eval(key)?))
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!truthy(&value)),
                    UnaryOp::Neg => number(-to_number(&value)),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !truthy(&left),
                    LogicalOp::Or => truthy(&left),
                    LogicalOp::Nullish => !left.is_null(),
                };
                if short_circuit { Ok(left) } else { self.eval(right) }
            }
            Expr::Conditional { test, consequent, alternate } => {
                if truthy(&self.eval(test)?) {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
        }
    }

    fn identifier(&self, name: &str) -> Result<Value, ExprError> {
        match name {
            "inputs" => Ok(Value::Object(self.inputs.clone())),
            "data" => Ok(Value::Object(self.data.clone())),
            _ => Err(ExprError::UnknownIdentifier(name.to_string())),
        }
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, ExprError> {
        let args = args.iter().map(|arg| self.eval(arg)).collect::<Result<Vec<_>, _>>()?;

        // A method on a namespace constant (`Math.PI.toFixed(2)`).
        if let Expr::Member { object, property: method } = callee {
            if let Some(value) = object.dotted_name().as_deref().and_then(builtins::constant) {
                return builtins::call_method(&value, method, &args);
            }
        }
        if let Some(path) = namespaced(callee) {
            return builtins::call_function(self, &path, &args);
        }
        match callee {
            Expr::Ident(name) => builtins::call_function(self, name, &args),
            Expr::Member { object, property: method } => {
                let receiver = self.eval(object)?;
                builtins::call_method(&receiver, method, &args)
            }
            other => Err(ExprError::NotCallable(describe(other))),
        }
    }
}

/// Dotted path of a member chain rooted at a namespace, if it is one.
fn namespaced(expr: &Expr) -> Option<String> {
    let path = expr.dotted_name()?;
    let root = path.split('.').next()?;
    NAMESPACES.contains(&root).then_some(path)
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let ordered = |accept: fn(Ordering) -> bool| Value::Bool(compare(left, right).is_some_and(accept));

    match op {
        BinaryOp::Add => match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) => Value::String(display(left) + &display(right)),
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                Value::String(display(left) + &display(right))
            }
            _ => number(to_number(left) + to_number(right)),
        },
        BinaryOp::Sub => number(to_number(left) - to_number(right)),
        BinaryOp::Mul => number(to_number(left) * to_number(right)),
        BinaryOp::Div => number(to_number(left) / to_number(right)),
        BinaryOp::Rem => number(to_number(left) % to_number(right)),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(left, right)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_eq(left, right)),
        BinaryOp::Lt => ordered(Ordering::is_lt),
        BinaryOp::Gt => ordered(Ordering::is_gt),
        BinaryOp::LtEq => ordered(Ordering::is_le),
        BinaryOp::GtEq => ordered(Ordering::is_ge),
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Literal(value) => value.to_string(),
        Expr::Array(_) => "array literal".to_string(),
        Expr::Index { .. } => "indexed value".to_string(),
        Expr::Call { .. } => "call result".to_string(),
        _ => "expression".to_string(),
    }
}
