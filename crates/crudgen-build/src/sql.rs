//! SQL DDL rendering over a `TablePlan`.
//!
//! Pure string building; everything that can fail has already failed
//! during planning. Dialect differences are confined to type names,
//! identifier quoting, and placeholders.

use crate::plan::{ColumnType, EnumTable, Junction, TablePlan};
use crudgen_core::lower::Dialect;
use crudgen_schema::types::ScalarType;
use std::fmt::Write;

/// Storage type name for a column. Timestamps are epoch seconds, enums
/// store the variant ordinal.
#[must_use]
pub fn sql_type(ty: &ColumnType, dialect: Dialect) -> &'static str {
    match ty {
        ColumnType::Scalar(scalar) => scalar_type(*scalar, dialect),
        ColumnType::Enum { .. } => "INTEGER",
        ColumnType::Timestamp => "BIGINT",
    }
}

fn scalar_type(ty: ScalarType, dialect: Dialect) -> &'static str {
    match ty {
        ScalarType::Bool => "BOOLEAN",
        ScalarType::Bytes => match dialect {
            Dialect::Postgres => "BYTEA",
            Dialect::Sqlite => "BLOB",
        },
        ScalarType::Double => match dialect {
            Dialect::Postgres => "DOUBLE PRECISION",
            Dialect::Sqlite => "REAL",
        },
        ScalarType::Float => "REAL",
        ScalarType::Int32 | ScalarType::Uint32 => "INTEGER",
        ScalarType::Int64 | ScalarType::Uint64 => "BIGINT",
        ScalarType::String => "TEXT",
    }
}

/// Full DDL for one message: enum lookup tables first (referenced rows
/// must exist), then the main table, then junction tables.
#[must_use]
pub fn ddl(plan: &TablePlan, dialect: Dialect) -> String {
    let mut out = String::new();

    for table in &plan.enums {
        out.push_str(&enum_table(table, dialect));
        out.push('\n');
    }

    out.push_str(&create_table(plan, dialect));

    for junction in &plan.junctions {
        out.push('\n');
        out.push_str(&junction_table(junction, dialect));
    }

    out
}

/// `CREATE TABLE` for the message itself: columns in declaration order,
/// a PK clause iff keys are declared, and a UNIQUE constraint per named
/// unique-identifier group.
#[must_use]
pub fn create_table(plan: &TablePlan, dialect: Dialect) -> String {
    let mut lines = Vec::new();

    for column in &plan.columns {
        let mut line = format!(
            "    {} {}",
            dialect.quote(&column.name),
            sql_type(&column.ty, dialect)
        );
        if !column.nullable {
            line.push_str(" NOT NULL");
        }
        lines.push(line);
    }

    if !plan.key.is_empty() {
        lines.push(format!("    PRIMARY KEY ({})", quoted_list(&plan.key, dialect)));
    }

    for lookup in &plan.uid_lookups {
        // the primary group is already the PK clause
        if lookup.group == crudgen_schema::PRIMARY_UID_GROUP {
            continue;
        }
        lines.push(format!("    UNIQUE ({})", quoted_list(&lookup.columns, dialect)));
    }

    format!(
        "CREATE TABLE {} (\n{}\n);\n",
        dialect.quote(&plan.table),
        lines.join(",\n")
    )
}

/// Ordinal-to-symbol lookup table for a referenced enum, pre-populated
/// with one row per variant.
#[must_use]
pub fn enum_table(table: &EnumTable, dialect: Dialect) -> String {
    let mut out = format!(
        "CREATE TABLE {} (\n    {} INTEGER NOT NULL,\n    {} TEXT NOT NULL,\n    PRIMARY KEY ({})\n);\n",
        dialect.quote(&table.table),
        dialect.quote("id"),
        dialect.quote("name"),
        dialect.quote("id"),
    );

    for (number, name) in &table.rows {
        let _ = writeln!(
            out,
            "INSERT INTO {} ({}, {}) VALUES ({number}, '{name}');",
            dialect.quote(&table.table),
            dialect.quote("id"),
            dialect.quote("name"),
        );
    }

    out
}

/// Junction table for a many-to-many relation; the pair is the key.
#[must_use]
pub fn junction_table(junction: &Junction, dialect: Dialect) -> String {
    format!(
        "CREATE TABLE {} (\n    {} {} NOT NULL,\n    {} {} NOT NULL,\n    PRIMARY KEY ({}, {})\n);\n",
        dialect.quote(&junction.table),
        dialect.quote(&junction.left_column),
        sql_type(&junction.left_ty, dialect),
        dialect.quote(&junction.right_column),
        sql_type(&junction.right_ty, dialect),
        dialect.quote(&junction.left_column),
        dialect.quote(&junction.right_column),
    )
}

/// Batched insert statement covering every column.
#[must_use]
pub fn insert_statement(plan: &TablePlan, dialect: Dialect) -> String {
    let columns: Vec<String> = plan
        .insert
        .columns
        .iter()
        .map(|i| dialect.quote(&plan.columns[*i].name))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len())
        .map(|n| dialect.placeholder(n))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote(&plan.table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Full-row select; a lowered predicate appends as ` WHERE ...`.
#[must_use]
pub fn select_statement(plan: &TablePlan, dialect: Dialect) -> String {
    let columns: Vec<String> = plan
        .columns
        .iter()
        .map(|c| dialect.quote(&c.name))
        .collect();

    format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        dialect.quote(&plan.table)
    )
}

/// Unmasked update: every non-key column set, keyed by the primary key.
/// Set placeholders come first so bind order is set values then key values.
#[must_use]
pub fn update_statement(plan: &TablePlan, dialect: Dialect) -> String {
    let mut ordinal = 0;
    let mut next = || {
        ordinal += 1;
        dialect.placeholder(ordinal)
    };

    let sets: Vec<String> = plan
        .update
        .set
        .iter()
        .map(|i| format!("{} = {}", dialect.quote(&plan.columns[*i].name), next()))
        .collect();
    let keys: Vec<String> = plan
        .update
        .key
        .iter()
        .map(|i| format!("{} = {}", dialect.quote(&plan.columns[*i].name), next()))
        .collect();

    format!(
        "UPDATE {} SET {} WHERE {}",
        dialect.quote(&plan.table),
        sets.join(", "),
        keys.join(" AND ")
    )
}

/// Bare delete; a lowered predicate appends as ` WHERE ...`.
#[must_use]
pub fn delete_statement(plan: &TablePlan, dialect: Dialect) -> String {
    format!("DELETE FROM {}", dialect.quote(&plan.table))
}

/// Keyed select for one unique-identifier group.
#[must_use]
pub fn select_by_statement(
    plan: &TablePlan,
    lookup: &crate::plan::UidLookup,
    dialect: Dialect,
) -> String {
    let conditions: Vec<String> = lookup
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", dialect.quote(column), dialect.placeholder(i + 1)))
        .collect();

    format!(
        "{} WHERE {}",
        select_statement(plan, dialect),
        conditions.join(" AND ")
    )
}

fn quoted_list(names: &[String], dialect: Dialect) -> String {
    names
        .iter()
        .map(|n| dialect.quote(n))
        .collect::<Vec<_>>()
        .join(", ")
}
