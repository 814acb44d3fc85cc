#[cfg(test)]
mod tests;

use crate::{
    expr::{EvalError, Expr, eval},
    mask::FieldMask,
    value::Value,
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// StoreError
///
/// Typed runtime error surfaced by generated repositories. Callers can
/// distinguish constraint violations from modeling mistakes; no variant is
/// retried automatically.
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("duplicate key ({key}) for table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("record for table '{table}' has no value for key field '{field}'")]
    MissingKeyValue { table: String, field: String },

    #[error("table '{table}' declares no unique identifier; update is not possible")]
    NoUniqueIdentifier { table: String },

    #[error("table '{table}' has no insertable fields")]
    NothingToPersist { table: String },

    #[error("table '{table}' has no updatable fields outside its unique identifier")]
    NothingToUpdate { table: String },

    #[error(transparent)]
    Predicate(#[from] EvalError),
}

///
/// TableSpec
///
/// Storage shape of one message: non-ignored fields in declaration order
/// plus the unique-identifier field set used to key rows. Generated code
/// embeds one spec per repository.
///

#[derive(Clone, Debug, Default)]
pub struct TableSpec {
    table: String,
    fields: Vec<String>,
    key: Vec<String>,
}

impl TableSpec {
    #[must_use]
    pub fn new<T, F, K>(table: T, fields: F, key: K) -> Self
    where
        T: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            table: table.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            key: key.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Fields outside the unique identifier, in declaration order.
    pub fn non_key_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| !self.key.contains(f))
            .map(String::as_str)
    }
}

///
/// Record
///
/// Field-level view of a message instance. Generated code implements this
/// per message; the store never sees concrete message types.
///

pub trait Record: Clone + Default {
    /// Current scalar value of a field, if the record carries one.
    /// Message-typed relation fields surface their nested key value.
    fn value_of(&self, field: &str) -> Option<Value>;

    /// Copy one field's content from another record of the same type.
    /// Returns false when the field name is unknown.
    fn copy_field(&mut self, from: &Self, field: &str) -> bool;

    /// Field mask attached to this record, recognized by Create/Update.
    fn mask(&self) -> Option<&FieldMask>;
}

///
/// MemTable
///
/// In-memory table runtime with the same operation semantics the SQL
/// backends get from their stores: batched transactional create, masked
/// update, predicate-filtered read/delete.
///

#[derive(Clone, Debug, Default)]
pub struct MemTable<R: Record> {
    spec: TableSpec,
    rows: BTreeMap<Vec<Value>, R>,
}

impl<R: Record> MemTable<R> {
    #[must_use]
    pub const fn new(spec: TableSpec) -> Self {
        Self {
            spec,
            rows: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn spec(&self) -> &TableSpec {
        &self.spec
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a batch of records. All-or-nothing: the table is untouched
    /// unless every record in the batch is accepted.
    pub fn create(&mut self, records: &[R]) -> Result<Vec<R>, StoreError> {
        if self.spec.fields().is_empty() {
            return Err(StoreError::NothingToPersist {
                table: self.spec.table().to_string(),
            });
        }

        // stage the whole batch before touching the table
        let mut staged: BTreeMap<Vec<Value>, R> = BTreeMap::new();
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let row = self.apply_create_mask(record);
            let key = self.key_of(&row)?;

            if self.rows.contains_key(&key) || staged.contains_key(&key) {
                return Err(StoreError::DuplicateKey {
                    table: self.spec.table().to_string(),
                    key: format_key(&key),
                });
            }

            stored.push(row.clone());
            staged.insert(key, row);
        }

        self.rows.extend(staged);

        Ok(stored)
    }

    /// Return every record matching the predicate; `None` returns all rows.
    pub fn read(&self, expr: Option<&Expr>) -> Result<Vec<R>, StoreError> {
        let mut out = Vec::new();

        for row in self.rows.values() {
            if matches(expr, row)? {
                out.push(row.clone());
            }
        }

        Ok(out)
    }

    /// Update stored records keyed by their unique-identifier values.
    ///
    /// A record with no stored counterpart is skipped, never inserted. A
    /// record whose mask selects no updatable field is a per-record no-op.
    pub fn update(&mut self, records: &[R]) -> Result<Vec<R>, StoreError> {
        if self.spec.key().is_empty() {
            return Err(StoreError::NoUniqueIdentifier {
                table: self.spec.table().to_string(),
            });
        }
        if self.spec.non_key_fields().next().is_none() {
            return Err(StoreError::NothingToUpdate {
                table: self.spec.table().to_string(),
            });
        }

        // stage all edits, then commit in one step
        let mut staged: Vec<(Vec<Value>, R)> = Vec::new();

        for record in records {
            let key = self.key_of(record)?;
            let Some(current) = self.rows.get(&key) else {
                continue;
            };

            let mut updated = current.clone();
            for field in self.spec.non_key_fields() {
                let selected = record.mask().is_none_or(|mask| mask.touches(field));
                if selected {
                    updated.copy_field(record, field);
                }
            }

            staged.push((key, updated));
        }

        let mut stored = Vec::with_capacity(staged.len());
        for (key, row) in staged {
            stored.push(row.clone());
            self.rows.insert(key, row);
        }

        Ok(stored)
    }

    /// Delete every record matching the predicate; `None` clears the table.
    /// Returns the number of deleted rows.
    pub fn delete(&mut self, expr: Option<&Expr>) -> Result<usize, StoreError> {
        let Some(expr) = expr else {
            let count = self.rows.len();
            self.rows.clear();
            return Ok(count);
        };

        // evaluate against every row before removing anything
        let mut doomed = Vec::new();
        for (key, row) in &self.rows {
            if matches(Some(expr), row)? {
                doomed.push(key.clone());
            }
        }

        for key in &doomed {
            self.rows.remove(key);
        }

        Ok(doomed.len())
    }

    // Materialize the row a create call actually stores: full copy without
    // a mask, mask-selected fields over defaults with one.
    fn apply_create_mask(&self, record: &R) -> R {
        let Some(mask) = record.mask() else {
            return record.clone();
        };

        let mut row = R::default();
        for field in self.spec.fields() {
            if mask.touches(field) {
                row.copy_field(record, field);
            }
        }

        row
    }

    fn key_of(&self, record: &R) -> Result<Vec<Value>, StoreError> {
        self.spec
            .key()
            .iter()
            .map(|field| {
                record
                    .value_of(field)
                    .ok_or_else(|| StoreError::MissingKeyValue {
                        table: self.spec.table().to_string(),
                        field: field.clone(),
                    })
            })
            .collect()
    }
}

fn matches<R: Record>(expr: Option<&Expr>, row: &R) -> Result<bool, StoreError> {
    match expr {
        None => Ok(true),
        Some(expr) => Ok(eval(expr, &|field| row.value_of(field))?),
    }
}

fn format_key(key: &[Value]) -> String {
    key.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
