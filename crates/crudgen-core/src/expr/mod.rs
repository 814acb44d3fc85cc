mod eval;
#[cfg(test)]
mod tests;

pub use eval::{EvalError, eval};

use crate::value::Value;
use serde::{Deserialize, Serialize};

///
/// Expr
///
/// Predicate expression tree shared by generated repositories and their
/// callers. The set of node kinds is closed; consumers match exhaustively
/// so a new kind is a compile-time exercise for every backend.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Expr {
    /// Reference to a field of the repository's message, by field name.
    Ident(String),

    /// Scalar literal.
    Scalar(Value),

    /// Timestamp literal, seconds since the Unix epoch.
    Timestamp(i64),

    /// Equality between two sub-expressions.
    Eq(Box<Expr>, Box<Expr>),

    /// Logical conjunction.
    And(Box<Expr>, Box<Expr>),

    /// Logical disjunction.
    Or(Box<Expr>, Box<Expr>),

    /// Logical negation.
    Not(Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn ident(field: impl Into<String>) -> Self {
        Self::Ident(field.into())
    }

    #[must_use]
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    #[must_use]
    pub const fn timestamp(seconds: i64) -> Self {
        Self::Timestamp(seconds)
    }

    #[must_use]
    pub fn equal(left: Self, right: Self) -> Self {
        Self::Eq(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn not(operand: Self) -> Self {
        Self::Not(Box::new(operand))
    }

    /// Shorthand for the common `field = literal` predicate.
    #[must_use]
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::equal(Self::ident(field), Self::scalar(value))
    }
}
