use crate::{
    node::MessageId,
    types::{Backend, Operation, RelationKind},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

///
/// CrudModel
///
/// Enriched persistence model produced by semantic analysis for one
/// annotated message. Field references are indexes into the message's
/// declaration-order field list.
///

#[derive(Clone, Debug, Serialize)]
pub struct CrudModel {
    pub message: MessageId,

    pub backends: BTreeSet<Backend>,
    pub operations: BTreeSet<Operation>,

    /// Primary-key fields, in annotation order.
    pub primary_key: Vec<usize>,

    /// Field-mask field, at most one.
    pub field_mask: Option<usize>,

    /// Timestamp bookkeeping fields, at most one each.
    pub created_at: Option<usize>,
    pub updated_at: Option<usize>,

    /// Unique-identifier groups by name; always contains the implicit
    /// primary-key group.
    pub uid_groups: BTreeMap<String, Vec<usize>>,

    /// Relationships keyed by the carrying field.
    pub relations: BTreeMap<usize, Relation>,
}

impl CrudModel {
    /// Whether a field participates in the primary key.
    #[must_use]
    pub fn is_prime(&self, field: usize) -> bool {
        self.primary_key.contains(&field)
    }

    /// Fields outside the primary key, given the message's field count.
    #[must_use]
    pub fn non_prime(&self, field_count: usize) -> Vec<usize> {
        (0..field_count).filter(|i| !self.is_prime(*i)).collect()
    }

    /// The smallest unique-identifier group; ties resolve to the implicit
    /// primary-key group. Relation columns store this group's value.
    #[must_use]
    pub fn minimal_uid(&self) -> &[usize] {
        let mut best: Option<(&str, &Vec<usize>)> = None;

        for (name, fields) in &self.uid_groups {
            let better = match best {
                None => true,
                Some((best_name, best_fields)) => {
                    fields.len() < best_fields.len()
                        || (fields.len() == best_fields.len()
                            && name == crate::PRIMARY_UID_GROUP
                            && best_name != crate::PRIMARY_UID_GROUP)
                }
            };
            if better {
                best = Some((name, fields));
            }
        }

        best.map_or(&[], |(_, fields)| fields)
    }

    #[must_use]
    pub fn supports(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    #[must_use]
    pub fn targets(&self, backend: Backend) -> bool {
        self.backends.contains(&backend)
    }
}

///
/// Relation
///
/// Directed annotation from a message field to another message. The field
/// must be message-typed and not ignored; both ends are resolved ids.
///

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Relation {
    pub kind: RelationKind,

    /// Defining message.
    pub source: MessageId,

    /// Index of the carrying field within the defining message.
    pub field: usize,

    /// Related message.
    pub target: MessageId,
}
