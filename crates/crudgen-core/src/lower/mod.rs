
use crate::{expr::Expr, value::Value};
use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// LowerError
///

#[derive(Debug, ThisError)]
pub enum LowerError {
    #[error("predicate references field '{field}' unknown to table '{table}'")]
    UnknownField { table: String, field: String },
}

///
/// Dialect
///
/// Placeholder and quoting rules differ per SQL backend; everything else
/// about lowering is shared.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, FromStr, Ord, PartialEq, PartialOrd, Serialize,
)]
#[remain::sorted]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Positional placeholder for the `ordinal`-th bind value (1-based).
    #[must_use]
    pub fn placeholder(self, ordinal: usize) -> String {
        match self {
            Self::Postgres => format!("${ordinal}"),
            Self::Sqlite => format!("?{ordinal}"),
        }
    }

    #[must_use]
    pub fn quote(self, ident: &str) -> String {
        format!("\"{ident}\"")
    }
}

///
/// ColumnMap
///
/// Per-message lowering table built once at generation time from the
/// message's non-ignored fields: field name -> storage column name.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ColumnMap {
    table: String,
    columns: BTreeMap<String, String>,
}

impl ColumnMap {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn insert(&mut self, field: impl Into<String>, column: impl Into<String>) {
        self.columns.insert(field.into(), column.into());
    }

    #[must_use]
    pub fn column(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(String::as_str)
    }

    /// Quoted, table-qualified reference for a field, if the field exists.
    #[must_use]
    pub fn column_ref(&self, field: &str, dialect: Dialect) -> Option<String> {
        self.column(field)
            .map(|col| format!("{}.{}", dialect.quote(&self.table), dialect.quote(col)))
    }
}

///
/// Predicate
///
/// Lowered WHERE-clause text plus its bind values. Bind order matches
/// placeholder order exactly: left-to-right, depth-first.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Predicate {
    pub clause: String,
    pub binds: Vec<Value>,
}

/// Lower a predicate expression into SQL text for one table.
pub fn lower(expr: &Expr, map: &ColumnMap, dialect: Dialect) -> Result<Predicate, LowerError> {
    let mut binds = Vec::new();
    let clause = lower_node(expr, map, dialect, &mut binds)?;

    Ok(Predicate { clause, binds })
}

// Recursive descent; `binds` accumulates in placeholder order.
fn lower_node(
    expr: &Expr,
    map: &ColumnMap,
    dialect: Dialect,
    binds: &mut Vec<Value>,
) -> Result<String, LowerError> {
    match expr {
        Expr::Ident(field) => {
            map.column_ref(field, dialect)
                .ok_or_else(|| LowerError::UnknownField {
                    table: map.table().to_string(),
                    field: field.clone(),
                })
        }
        Expr::Scalar(value) => {
            binds.push(value.clone());
            Ok(dialect.placeholder(binds.len()))
        }
        Expr::Timestamp(seconds) => {
            binds.push(Value::Timestamp(*seconds));
            Ok(dialect.placeholder(binds.len()))
        }
        Expr::Eq(left, right) => lower_binary(left, right, "=", map, dialect, binds),
        Expr::And(left, right) => lower_binary(left, right, "AND", map, dialect, binds),
        Expr::Or(left, right) => lower_binary(left, right, "OR", map, dialect, binds),
        Expr::Not(operand) => {
            let inner = lower_node(operand, map, dialect, binds)?;
            Ok(format!("(NOT {inner})"))
        }
    }
}

fn lower_binary(
    left: &Expr,
    right: &Expr,
    op: &str,
    map: &ColumnMap,
    dialect: Dialect,
    binds: &mut Vec<Value>,
) -> Result<String, LowerError> {
    // left before right keeps binds aligned with placeholder numbering
    let lhs = lower_node(left, map, dialect, binds)?;
    let rhs = lower_node(right, map, dialect, binds)?;

    Ok(format!("({lhs} {op} {rhs})"))
}
