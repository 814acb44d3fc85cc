
use crate::{
    PRIMARY_UID_GROUP, err,
    descriptor::CrudOptions,
    error::ErrorTree,
    node::{CrudModel, Field, FieldKind, FileId, Message, MessageId, Relation, TypeRef},
    registry::Registry,
    types::{Backend, Operation},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;
use tracing::debug;

///
/// AnalyzeError
///

#[derive(Debug, ThisError)]
pub enum AnalyzeError {
    #[error("crud analysis failed: {0}")]
    Validation(ErrorTree),
}

///
/// Analysis
///
/// Immutable output of semantic analysis: one validated `CrudModel` per
/// annotated message, plus per-file relation lists feeding junction-table
/// and cross-file-import generation. The registry graph is never mutated.
///

#[derive(Debug, Default)]
pub struct Analysis {
    models: BTreeMap<MessageId, CrudModel>,
    file_relations: BTreeMap<FileId, Vec<Relation>>,
}

impl Analysis {
    #[must_use]
    pub fn model(&self, message: MessageId) -> Option<&CrudModel> {
        self.models.get(&message)
    }

    pub fn models(&self) -> impl Iterator<Item = (MessageId, &CrudModel)> {
        self.models.iter().map(|(id, m)| (*id, m))
    }

    #[must_use]
    pub fn file_relations(&self, file: FileId) -> &[Relation] {
        self.file_relations.get(&file).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Analyze every message of the given files-to-generate.
///
/// Must run after the registry's resolve pass: relationship and inline
/// checks read resolved type references. All rule violations across all
/// files accumulate into one combined failure; there is no partial mode.
pub fn analyze(registry: &Registry, files: &[FileId]) -> Result<Analysis, AnalyzeError> {
    let mut analysis = Analysis::default();
    let mut errs = ErrorTree::new();

    for file in files {
        analyze_file(registry, *file, &mut analysis, &mut errs);
    }

    errs.result().map_err(AnalyzeError::Validation)?;

    Ok(analysis)
}

fn analyze_file(registry: &Registry, file: FileId, analysis: &mut Analysis, errs: &mut ErrorTree) {
    for id in &registry.file(file).messages {
        let message = registry.message(*id);

        // messages without a persistence annotation get no repository
        let Some(crud) = &message.crud else {
            continue;
        };

        analyze_message(registry, *id, message, crud, analysis, errs);
    }
}

fn analyze_message(
    registry: &Registry,
    id: MessageId,
    message: &Message,
    crud: &CrudOptions,
    analysis: &mut Analysis,
    errs: &mut ErrorTree,
) {
    let mut model = CrudModel {
        message: id,
        backends: crud.backends.clone(),
        operations: crud.operations.clone(),
        primary_key: Vec::new(),
        field_mask: None,
        created_at: None,
        updated_at: None,
        uid_groups: BTreeMap::new(),
        relations: BTreeMap::new(),
    };

    // empty annotation sets fall back to the broadest sensible defaults
    if model.operations.is_empty() {
        model.operations.extend(Operation::all());
    }
    if model.backends.is_empty() {
        model.backends.insert(Backend::Memory);
    }

    resolve_field_mask(message, crud, &mut model, errs);
    resolve_primary_key(message, crud, &mut model, errs);
    resolve_timestamps(message, crud, &mut model, errs);
    validate_field_flags(message, errs);
    resolve_uid_groups(message, crud, &mut model, errs);
    resolve_relations(registry, id, message, &mut model, analysis, errs);

    debug!(message = %message.full_name, "crud model built");
    analysis.models.insert(id, model);
}

// Step: field-mask field, at most one, must exist.
fn resolve_field_mask(
    message: &Message,
    crud: &CrudOptions,
    model: &mut CrudModel,
    errs: &mut ErrorTree,
) {
    let Some(name) = &crud.field_mask else {
        return;
    };

    match message.field_named(name) {
        Some((index, _)) => model.field_mask = Some(index),
        None => err!(
            errs,
            "message '{}' declares unknown field-mask field '{name}'",
            message.full_name
        ),
    }
}

// Step: primary-key fields; each must exist, be key-eligible, and not be
// flagged ignored.
fn resolve_primary_key(
    message: &Message,
    crud: &CrudOptions,
    model: &mut CrudModel,
    errs: &mut ErrorTree,
) {
    for name in &crud.primary_key {
        let Some((index, field)) = message.field_named(name) else {
            err!(
                errs,
                "message '{}' declares unknown primary-key field '{name}'",
                message.full_name
            );
            continue;
        };

        if field.options.ignore {
            err!(
                errs,
                "field '{name}' of message '{}' is both primary-key and ignored",
                message.full_name
            );
            continue;
        }
        if !candidate_key_eligible(message, name, field, "primary-key", errs) {
            continue;
        }

        model.primary_key.push(index);
    }
}

// Step: created-at/updated-at must resolve to timestamp-flagged fields.
fn resolve_timestamps(
    message: &Message,
    crud: &CrudOptions,
    model: &mut CrudModel,
    errs: &mut ErrorTree,
) {
    model.created_at = resolve_timestamp_field(message, crud.created_at.as_deref(), "created-at", errs);
    model.updated_at = resolve_timestamp_field(message, crud.updated_at.as_deref(), "updated-at", errs);
}

fn resolve_timestamp_field(
    message: &Message,
    name: Option<&str>,
    role: &str,
    errs: &mut ErrorTree,
) -> Option<usize> {
    let name = name?;

    let Some((index, field)) = message.field_named(name) else {
        err!(
            errs,
            "message '{}' declares unknown {role} field '{name}'",
            message.full_name
        );
        return None;
    };

    if !field.options.timestamp {
        err!(
            errs,
            "{role} field '{name}' of message '{}' is not timestamp-typed",
            message.full_name
        );
        return None;
    }

    Some(index)
}

// Step: per-field flag invariants that hold regardless of key membership.
// Inline column expansion itself happens at planning time.
fn validate_field_flags(message: &Message, errs: &mut ErrorTree) {
    for field in &message.fields {
        if field.options.inline && field.message_target().is_none() {
            err!(
                errs,
                "inlined field '{}' of message '{}' is not message-typed",
                field.name,
                message.full_name
            );
        }
    }
}

// Step: unique-identifier groups. The primary key forms the implicit
// default group; declared groups must be non-empty and key-eligible.
fn resolve_uid_groups(
    message: &Message,
    crud: &CrudOptions,
    model: &mut CrudModel,
    errs: &mut ErrorTree,
) {
    if !model.primary_key.is_empty() {
        model
            .uid_groups
            .insert(PRIMARY_UID_GROUP.to_string(), model.primary_key.clone());
    }

    for (group, names) in &crud.uid_groups {
        if names.is_empty() {
            err!(
                errs,
                "unique-identifier group '{group}' of message '{}' is empty",
                message.full_name
            );
            continue;
        }
        if group == PRIMARY_UID_GROUP {
            err!(
                errs,
                "unique-identifier group name '{group}' is reserved (message '{}')",
                message.full_name
            );
            continue;
        }

        let mut fields = Vec::with_capacity(names.len());
        let mut valid = true;
        for name in names {
            let Some((index, field)) = message.field_named(name) else {
                err!(
                    errs,
                    "unique-identifier group '{group}' of message '{}' references unknown field '{name}'",
                    message.full_name
                );
                valid = false;
                continue;
            };
            if !candidate_key_eligible(message, name, field, "candidate-key", errs) {
                valid = false;
                continue;
            }
            fields.push(index);
        }

        if valid {
            model.uid_groups.insert(group.clone(), fields);
        }
    }
}

// Step: relationship fields. Must be message-typed, not ignored, and
// resolve to a known message.
fn resolve_relations(
    registry: &Registry,
    id: MessageId,
    message: &Message,
    model: &mut CrudModel,
    analysis: &mut Analysis,
    errs: &mut ErrorTree,
) {
    for (index, field) in message.fields.iter().enumerate() {
        let Some(relation) = &field.options.relation else {
            continue;
        };

        if field.options.ignore {
            err!(
                errs,
                "relationship field '{}' of message '{}' cannot be ignored",
                field.name,
                message.full_name
            );
            continue;
        }
        let Some(declared_target) = field.message_target() else {
            err!(
                errs,
                "relationship field '{}' of message '{}' is not message-typed",
                field.name,
                message.full_name
            );
            continue;
        };

        // explicit target name wins over the field's declared type
        let target = match &relation.target {
            Some(name) => match registry.lookup_message(&message.full_name, name) {
                Ok(target) => target,
                Err(e) => {
                    err!(
                        errs,
                        "relationship field '{}' of message '{}': {e}",
                        field.name,
                        message.full_name
                    );
                    continue;
                }
            },
            None => declared_target,
        };

        let record = Relation {
            kind: relation.kind,
            source: id,
            field: index,
            target,
        };
        model.relations.insert(index, record);
        analysis
            .file_relations
            .entry(message.file)
            .or_default()
            .push(record);
    }
}

// Shared candidate-key rule: no container, float, bool, enum, message, or
// group types; these lack the plain equality/ordering a key column needs.
fn candidate_key_eligible(
    message: &Message,
    name: &str,
    field: &Field,
    role: &str,
    errs: &mut ErrorTree,
) -> bool {
    if field.cardinality.is_container() {
        err!(
            errs,
            "{role} field '{name}' of message '{}' has a container type",
            message.full_name
        );
        return false;
    }

    match &field.kind {
        FieldKind::Scalar(ty) if ty.supports_key() => true,
        FieldKind::Scalar(ty) => {
            err!(
                errs,
                "{role} field '{name}' of message '{}' has unsupported scalar type {ty}",
                message.full_name
            );
            false
        }
        FieldKind::Named(TypeRef::Enum(_)) => {
            err!(
                errs,
                "{role} field '{name}' of message '{}' is enum-typed",
                message.full_name
            );
            false
        }
        FieldKind::Named(_) => {
            err!(
                errs,
                "{role} field '{name}' of message '{}' is message-typed",
                message.full_name
            );
            false
        }
        FieldKind::Group(_) => {
            err!(
                errs,
                "{role} field '{name}' of message '{}' has a group type",
                message.full_name
            );
            false
        }
    }
}
