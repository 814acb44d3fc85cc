use crate::{expr::Expr, value::Value};
use thiserror::Error as ThisError;

///
/// EvalError
///

#[derive(Debug, ThisError)]
pub enum EvalError {
    #[error("expression references unknown field '{field}'")]
    UnknownField { field: String },

    #[error("expected a boolean expression, got a {kind} value")]
    NotBoolean { kind: &'static str },

    #[error("bare {kind} leaf is not a predicate; wrap it in an equality")]
    BareLeaf { kind: &'static str },
}

/// Evaluate a predicate expression against a single record.
///
/// `resolve` maps a field name to its current scalar value; the in-memory
/// backend passes `Record::value_of`. The same tree lowered to SQL by
/// `lower` must select exactly the records this function accepts.
pub fn eval<F>(expr: &Expr, resolve: &F) -> Result<bool, EvalError>
where
    F: Fn(&str) -> Option<Value>,
{
    match expr {
        Expr::Ident(_) | Expr::Scalar(_) | Expr::Timestamp(_) => Err(EvalError::BareLeaf {
            kind: leaf_kind(expr),
        }),
        Expr::Eq(left, right) => Ok(value_of(left, resolve)? == value_of(right, resolve)?),
        Expr::And(left, right) => Ok(eval(left, resolve)? && eval(right, resolve)?),
        Expr::Or(left, right) => Ok(eval(left, resolve)? || eval(right, resolve)?),
        Expr::Not(operand) => Ok(!eval(operand, resolve)?),
    }
}

// Reduce a sub-expression to a scalar value for equality comparison.
fn value_of<F>(expr: &Expr, resolve: &F) -> Result<Value, EvalError>
where
    F: Fn(&str) -> Option<Value>,
{
    match expr {
        Expr::Ident(field) => resolve(field).ok_or_else(|| EvalError::UnknownField {
            field: field.clone(),
        }),
        Expr::Scalar(value) => Ok(value.clone()),
        Expr::Timestamp(seconds) => Ok(Value::Timestamp(*seconds)),
        Expr::Eq(_, _) | Expr::And(_, _) | Expr::Or(_, _) | Expr::Not(_) => {
            eval(expr, resolve).map(Value::Bool)
        }
    }
}

const fn leaf_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Ident(_) => "identifier",
        Expr::Scalar(_) => "scalar",
        Expr::Timestamp(_) => "timestamp",
        _ => "expression",
    }
}
