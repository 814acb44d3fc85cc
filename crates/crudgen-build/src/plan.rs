//! Backend-neutral generation plans.
//!
//! A `TablePlan` is the pure, testable middle step between a message's
//! `CrudModel` and emitted text: explicit columns, insert/update plans,
//! enum lookup tables, junction tables, and the predicate column map.
//! Backend generators only render what is planned here.

use crate::idents::snake;
use crudgen_core::{lower::ColumnMap, mask::FieldMask};
use crudgen_schema::{
    PRIMARY_UID_GROUP,
    analyze::Analysis,
    node::{CrudModel, EnumId, Field, FieldKind, Message, MessageId, TypeRef},
    registry::Registry,
    types::{Backend, Operation, ScalarType},
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// PlanError
///
/// Schema/modeling errors caught while planning. Always fatal to the
/// compilation; always name the offending message and field.
///

#[derive(Debug, ThisError)]
pub enum PlanError {
    #[error(
        "relation field '{field}' of message '{message}' targets '{target}', which carries no persistence annotation"
    )]
    TargetNotPersisted {
        message: String,
        field: String,
        target: String,
    },

    #[error(
        "relation field '{field}' of message '{message}': minimal unique identifier of '{related}' has {key_fields} fields, exactly one is required"
    )]
    CompositeForeignKey {
        message: String,
        field: String,
        related: String,
        key_fields: usize,
    },

    #[error("inlined field '{field}' of message '{message}' forms an inline cycle")]
    InlineCycle { message: String, field: String },

    #[error("primary-key field '{field}' of message '{message}' produced no storage column")]
    MissingKeyColumn { message: String, field: String },

    #[error("message '{message}' declares create but has no storable column")]
    NothingToPersist { message: String },

    #[error("message '{message}' declares update but every column belongs to the key")]
    NothingToUpdate { message: String },

    #[error("field-mask path '{path}' does not name a column of message '{message}'")]
    UnknownMaskPath { message: String, path: String },
}

///
/// ColumnType
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Scalar(ScalarType),

    /// Enum-typed column, stored as the variant ordinal and paired with a
    /// lookup table mapping ordinal to symbolic name.
    Enum { lookup_table: String },

    /// Timestamp-flagged column.
    Timestamp,
}

///
/// Column
///

#[derive(Clone, Debug)]
pub struct Column {
    /// Storage column name, e.g. `profile_bio`.
    pub name: String,

    /// Dotted field path for field-mask matching, e.g. `profile.bio`.
    pub path: String,

    /// Top-level field carrying this column.
    pub field: String,

    pub ty: ColumnType,
    pub primary: bool,
    pub nullable: bool,
}

///
/// EnumTable
///
/// Auxiliary id -> symbolic-name lookup table for a referenced enum.
///

#[derive(Clone, Debug)]
pub struct EnumTable {
    pub table: String,
    pub rows: Vec<(i32, String)>,
}

///
/// Junction
///
/// Junction table materializing a many-to-many relation.
///

#[derive(Clone, Debug)]
pub struct Junction {
    pub table: String,
    pub left_column: String,
    pub left_ty: ColumnType,
    pub right_column: String,
    pub right_ty: ColumnType,
}

///
/// UidLookup
///
/// One unique-identifier group as generated lookup code sees it: the
/// group's columns and, for single-field groups, the scalar lookup key.
///

#[derive(Clone, Debug)]
pub struct UidLookup {
    pub group: String,
    pub columns: Vec<String>,

    /// Field paths matching `columns`, for predicate-based lookups.
    pub paths: Vec<String>,

    /// Lookup key type when the group has exactly one field.
    pub key_scalar: Option<ScalarType>,
}

///
/// InsertPlan / UpdatePlan
///

#[derive(Clone, Debug)]
pub struct InsertPlan {
    /// Column indexes inserted for an unmasked record (all of them).
    pub columns: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct UpdatePlan {
    /// Columns forming the row identity (minimal unique identifier).
    pub key: Vec<usize>,

    /// Columns an unmasked update rewrites.
    pub set: Vec<usize>,
}

///
/// TablePlan
///

#[derive(Clone, Debug)]
pub struct TablePlan {
    pub message: MessageId,
    pub message_name: String,
    pub table: String,

    pub columns: Vec<Column>,
    pub key: Vec<String>,
    pub uid_lookups: Vec<UidLookup>,
    pub enums: Vec<EnumTable>,
    pub junctions: Vec<Junction>,

    pub insert: InsertPlan,
    pub update: UpdatePlan,

    pub operations: BTreeSet<Operation>,
    pub backends: BTreeSet<Backend>,

    /// Name of the field-mask field, if the model declares one.
    pub mask_field: Option<String>,
}

impl TablePlan {
    /// Lower a validated crud model into a generation plan.
    pub fn build(
        registry: &Registry,
        analysis: &Analysis,
        model: &CrudModel,
    ) -> Result<Self, PlanError> {
        let message = registry.message(model.message);
        let mut builder = Builder {
            registry,
            analysis,
            model,
            message,
            columns: Vec::new(),
            enums: BTreeMap::new(),
            junctions: Vec::new(),
        };

        builder.collect_columns()?;

        let columns = builder.columns;
        let key = key_column_names(message, model, &columns)?;
        let uid_lookups = uid_lookups(message, model, &columns);

        let insert = InsertPlan {
            columns: (0..columns.len()).collect(),
        };
        let update_key: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| key.contains(&c.name))
            .map(|(i, _)| i)
            .collect();
        let update = UpdatePlan {
            set: (0..columns.len()).filter(|i| !update_key.contains(i)).collect(),
            key: update_key,
        };

        // declared operations that could never execute are modeling errors,
        // caught here so no backend bakes them into statement text
        if model.supports(Operation::Create) && insert.columns.is_empty() {
            return Err(PlanError::NothingToPersist {
                message: message.full_name.clone(),
            });
        }
        if model.supports(Operation::Update) && update.set.is_empty() {
            return Err(PlanError::NothingToUpdate {
                message: message.full_name.clone(),
            });
        }

        Ok(Self {
            message: model.message,
            message_name: message.name.clone(),
            table: snake(&message.name),
            columns,
            key,
            uid_lookups,
            enums: builder.enums.into_values().collect(),
            junctions: builder.junctions,
            insert,
            update,
            operations: model.operations.clone(),
            backends: model.backends.clone(),
            mask_field: model.field_mask.map(|i| message.fields[i].name.clone()),
        })
    }

    /// Predicate lowering table: field path -> storage column.
    #[must_use]
    pub fn column_map(&self) -> ColumnMap {
        let mut map = ColumnMap::new(self.table.clone());
        for column in &self.columns {
            map.insert(column.path.clone(), column.name.clone());
        }

        map
    }

    /// Insert-eligible columns for a masked record: the intersection of
    /// the mask's paths (nested paths expand) and available columns.
    /// Unknown paths select nothing; this is the run-time lenient side of
    /// mask handling.
    #[must_use]
    pub fn masked_columns(&self, mask: &FieldMask) -> Vec<usize> {
        self.insert
            .columns
            .iter()
            .copied()
            .filter(|i| mask.covers(&self.columns[*i].path))
            .collect()
    }

    /// Generation-time mask validation: every statically-declared path
    /// must select at least one column.
    pub fn validate_mask_paths<'a, I>(&self, paths: I) -> Result<(), PlanError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for path in paths {
            let probe = FieldMask::new([path]);
            if !self.columns.iter().any(|c| probe.covers(&c.path)) {
                return Err(PlanError::UnknownMaskPath {
                    message: self.message_name.clone(),
                    path: path.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Update `set` columns selected by a record's mask.
    #[must_use]
    pub fn masked_update_set(&self, mask: &FieldMask) -> Vec<usize> {
        self.update
            .set
            .iter()
            .copied()
            .filter(|i| mask.covers(&self.columns[*i].path))
            .collect()
    }
}

///
/// Builder
///

struct Builder<'a> {
    registry: &'a Registry,
    analysis: &'a Analysis,
    model: &'a CrudModel,
    message: &'a Message,

    columns: Vec<Column>,
    enums: BTreeMap<String, EnumTable>,
    junctions: Vec<Junction>,
}

impl Builder<'_> {
    fn collect_columns(&mut self) -> Result<(), PlanError> {
        for (index, field) in self.message.fields.iter().enumerate() {
            if field.options.ignore {
                continue;
            }

            if let Some(relation) = self.model.relations.get(&index) {
                self.plan_relation(index, field, relation.kind, relation.target)?;
                continue;
            }

            if field.options.inline {
                let mut visiting = BTreeSet::from([self.model.message]);
                self.expand_inline(field, &field.name, &mut visiting)?;
                continue;
            }

            self.plan_plain(index, field);
        }

        Ok(())
    }

    // Scalar, enum, and timestamp fields become one column each. Plain
    // message-typed fields without inline or relation annotations have no
    // storage representation and are skipped.
    fn plan_plain(&mut self, index: usize, field: &Field) {
        let Some(ty) = self.column_type(field) else {
            return;
        };

        self.columns.push(Column {
            name: snake(&field.name),
            path: field.name.clone(),
            field: field.name.clone(),
            ty,
            primary: self.model.is_prime(index),
            nullable: field.cardinality == crudgen_schema::types::Cardinality::Opt,
        });
    }

    fn plan_relation(
        &mut self,
        index: usize,
        field: &Field,
        kind: crudgen_schema::types::RelationKind,
        target: MessageId,
    ) -> Result<(), PlanError> {
        use crudgen_schema::types::RelationKind;

        match kind {
            RelationKind::ManyToOne | RelationKind::OneToOne => {
                let (key_name, key_ty) = self.single_key_of(field, target)?;
                self.columns.push(Column {
                    name: format!("{}_{key_name}", snake(&field.name)),
                    path: field.name.clone(),
                    field: field.name.clone(),
                    ty: key_ty,
                    primary: self.model.is_prime(index),
                    nullable: field.cardinality == crudgen_schema::types::Cardinality::Opt,
                });
            }
            RelationKind::OneToMany => {
                // stored on the many side; no local column
            }
            RelationKind::ManyToMany => {
                let (left_key, left_ty) = self.single_key_of(field, self.model.message)?;
                let (right_key, right_ty) = self.single_key_of(field, target)?;
                let left_table = snake(&self.message.name);
                let right_table = snake(&self.registry.message(target).name);

                self.junctions.push(Junction {
                    table: format!("{left_table}_{right_table}"),
                    left_column: format!("{left_table}_{left_key}"),
                    left_ty,
                    right_column: format!("{right_table}_{right_key}"),
                    right_ty,
                });
            }
        }

        Ok(())
    }

    // Resolve a related message's minimal unique identifier down to its
    // single key column; composite identifiers cannot back a relation
    // column, so anything but exactly one field is an error.
    fn single_key_of(
        &mut self,
        field: &Field,
        related: MessageId,
    ) -> Result<(String, ColumnType), PlanError> {
        let related_message = self.registry.message(related);
        let Some(related_model) = self.analysis.model(related) else {
            return Err(PlanError::TargetNotPersisted {
                message: self.message.full_name.clone(),
                field: field.name.clone(),
                target: related_message.full_name.clone(),
            });
        };

        let uid = related_model.minimal_uid();
        if uid.len() != 1 {
            return Err(PlanError::CompositeForeignKey {
                message: self.message.full_name.clone(),
                field: field.name.clone(),
                related: related_message.full_name.clone(),
                key_fields: uid.len(),
            });
        }

        let key_field = &related_message.fields[uid[0]];
        let ty = self
            .column_type(key_field)
            .unwrap_or(ColumnType::Scalar(ScalarType::String));

        Ok((snake(&key_field.name), ty))
    }

    // Flatten an inlined message-typed field into prefixed columns.
    fn expand_inline(
        &mut self,
        field: &Field,
        prefix: &str,
        visiting: &mut BTreeSet<MessageId>,
    ) -> Result<(), PlanError> {
        let Some(target) = field.message_target() else {
            // analyzer already rejected this; nothing to expand
            return Ok(());
        };

        if !visiting.insert(target) {
            return Err(PlanError::InlineCycle {
                message: self.message.full_name.clone(),
                field: field.name.clone(),
            });
        }

        let target_message = self.registry.message(target);
        for sub in &target_message.fields {
            if sub.options.ignore {
                continue;
            }

            if sub.options.inline {
                self.expand_inline(sub, &format!("{prefix}.{}", sub.name), visiting)?;
                continue;
            }

            let Some(ty) = self.column_type(sub) else {
                continue;
            };

            self.columns.push(Column {
                name: format!("{}_{}", snake_path(prefix), snake(&sub.name)),
                path: format!("{prefix}.{}", sub.name),
                field: top_level(prefix).to_string(),
                ty,
                primary: false,
                nullable: sub.cardinality == crudgen_schema::types::Cardinality::Opt,
            });
        }

        visiting.remove(&target);

        Ok(())
    }

    fn column_type(&mut self, field: &Field) -> Option<ColumnType> {
        if field.options.timestamp {
            return Some(ColumnType::Timestamp);
        }

        match &field.kind {
            FieldKind::Scalar(ty) => Some(ColumnType::Scalar(*ty)),
            FieldKind::Named(TypeRef::Enum(id)) => Some(self.enum_column(*id)),
            FieldKind::Named(_) | FieldKind::Group(_) => None,
        }
    }

    fn enum_column(&mut self, id: EnumId) -> ColumnType {
        let node = self.registry.enum_node(id);
        let table = format!("{}_lookup", snake(&node.name));

        self.enums.entry(table.clone()).or_insert_with(|| EnumTable {
            table: table.clone(),
            rows: node
                .variants
                .iter()
                .map(|v| (v.number, v.name.clone()))
                .collect(),
        });

        ColumnType::Enum {
            lookup_table: table,
        }
    }
}

// Primary-key columns in annotation order.
fn key_column_names(
    message: &Message,
    model: &CrudModel,
    columns: &[Column],
) -> Result<Vec<String>, PlanError> {
    model
        .primary_key
        .iter()
        .map(|index| {
            let field = &message.fields[*index];
            columns
                .iter()
                .find(|c| c.path == field.name)
                .map(|c| c.name.clone())
                .ok_or_else(|| PlanError::MissingKeyColumn {
                    message: message.full_name.clone(),
                    field: field.name.clone(),
                })
        })
        .collect()
}

// Unique-identifier groups mapped to storage columns; single-field groups
// expose their scalar lookup key type.
fn uid_lookups(message: &Message, model: &CrudModel, columns: &[Column]) -> Vec<UidLookup> {
    let mut lookups = Vec::new();

    for (group, fields) in &model.uid_groups {
        let group_columns: Vec<(String, String)> = fields
            .iter()
            .filter_map(|index| {
                let field = &message.fields[*index];
                columns
                    .iter()
                    .find(|c| c.path == field.name)
                    .map(|c| (c.name.clone(), c.path.clone()))
            })
            .collect();
        if group_columns.len() != fields.len() {
            continue;
        }

        let key_scalar = if fields.len() == 1 {
            message.fields[fields[0]].scalar()
        } else {
            None
        };

        let (group_names, group_paths): (Vec<String>, Vec<String>) =
            group_columns.into_iter().unzip();
        lookups.push(UidLookup {
            group: group.clone(),
            columns: group_names,
            paths: group_paths,
            key_scalar,
        });
    }

    // implicit primary group first, then named groups alphabetically
    lookups.sort_by(|a, b| {
        let rank = |l: &UidLookup| (l.group != PRIMARY_UID_GROUP, l.group.clone());
        rank(a).cmp(&rank(b))
    });

    lookups
}

// `profile.address` -> `profile_address`
fn snake_path(path: &str) -> String {
    path.split('.').map(snake).collect::<Vec<_>>().join("_")
}

fn top_level(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests;
