use super::parser::{Attribute, BinaryOp, Expr, Pattern, UnaryOp};
use crate::record::TaskRecord;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Runtime value of the predicate language
///
/// Strings borrow from the task being evaluated where possible, so `trace`
/// is not copied per task.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Float(f64),
    Str(Cow<'a, str>),
    Bool(bool),
}

impl Value<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

type EvalResult<T> = std::result::Result<T, String>;

fn attribute(record: &TaskRecord, attr: Attribute) -> Value<'_> {
    let count = |n: usize| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
    match attr {
        Attribute::Id => Value::Int(i64::try_from(record.id()).unwrap_or(i64::MAX)),
        Attribute::Dups => count(record.duplicate_ids().len()),
        Attribute::Duration => {
            Value::Int(i64::try_from(record.duration_minutes()).unwrap_or(i64::MAX))
        }
        Attribute::Lines => count(record.line_count()),
        Attribute::State => Value::Str(Cow::Borrowed(record.state())),
        Attribute::Trace => Value::Str(record.body_raw()),
    }
}

/// Evaluate `expr` against one task
pub fn evaluate<'r>(expr: &Expr, record: &'r TaskRecord) -> EvalResult<Value<'r>> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Attribute(attr) => Ok(attribute(record, *attr)),
        Expr::Unary(op, operand) => unary(*op, evaluate(operand, record)?),
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !expect_bool(evaluate(lhs, record)?, "&&")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool(evaluate(rhs, record)?, "&&")?))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if expect_bool(evaluate(lhs, record)?, "||")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool(evaluate(rhs, record)?, "||")?))
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, evaluate(lhs, record)?, evaluate(rhs, record)?),
        Expr::Match {
            negated,
            subject,
            pattern,
        } => {
            let subject = match evaluate(subject, record)? {
                Value::Str(s) => s,
                other => return Err(format!("cannot match a regex against {}", other.type_name())),
            };
            let matched = match pattern {
                Pattern::Static(regex) => regex.is_match(&subject),
                Pattern::Dynamic(expr) => match evaluate(expr, record)? {
                    Value::Str(p) => Regex::new(&p)
                        .map_err(|e| format!("invalid pattern '{}': {}", p, e))?
                        .is_match(&subject),
                    other => return Err(format!("regex pattern must be a string, got {}", other.type_name())),
                },
            };
            Ok(Value::Bool(matched != *negated))
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, record))
                .collect::<EvalResult<Vec<_>>>()?;
            (function.call)(&values)
        }
    }
}

fn expect_bool(value: Value<'_>, op: &str) -> EvalResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(format!("operator {} expects booleans, got {}", op, other.type_name())),
    }
}

fn unary(op: UnaryOp, value: Value<'_>) -> EvalResult<Value<'_>> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string()),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, other) => Err(format!("operator ! expects a boolean, got {}", other.type_name())),
        (UnaryOp::Neg, other) => Err(format!("operator - expects a number, got {}", other.type_name())),
    }
}

fn binary<'a>(op: BinaryOp, lhs: Value<'a>, rhs: Value<'a>) -> EvalResult<Value<'a>> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Cow::Owned(format!("{}{}", a, b)))),
            (lhs, rhs) => arithmetic(op, &lhs, &rhs),
        },
        _ => arithmetic(op, &lhs, &rhs),
    }
}

fn equals(lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(lhs: &Value<'_>, rhs: &Value<'_>) -> EvalResult<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or_else(|| "cannot compare NaN".to_string()),
            _ => Err(format!(
                "cannot compare {} with {}",
                lhs.type_name(),
                rhs.type_name()
            )),
        },
    }
}

fn arithmetic<'a>(op: BinaryOp, lhs: &Value<'_>, rhs: &Value<'_>) -> EvalResult<Value<'a>> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Div | BinaryOp::Rem if *b == 0 => return Err("division by zero".to_string()),
            BinaryOp::Div => a.checked_div(*b),
            BinaryOp::Rem => a.checked_rem(*b),
            _ => unreachable!("non-arithmetic operator {:?}", op),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string());
    }

    let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(format!(
            "operator {:?} is not supported between {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        ));
    };

    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => Err("division by zero".to_string()),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Rem => Ok(Value::Float(a % b)),
        _ => unreachable!("non-arithmetic operator {:?}", op),
    }
}
