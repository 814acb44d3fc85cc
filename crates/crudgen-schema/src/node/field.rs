use crate::{
    descriptor::FieldOptions,
    node::{EnumId, MessageId},
    types::{Cardinality, ScalarType},
};
use serde::Serialize;

///
/// Field
///
/// Belongs to exactly one message. Named type references start out
/// unresolved and are rewritten by the registry's second pass.
///

#[derive(Clone, Debug, Serialize)]
pub struct Field {
    pub name: String,
    pub cardinality: Cardinality,
    pub kind: FieldKind,
    pub options: FieldOptions,
}

impl Field {
    /// Resolved message target, if this field is message-typed.
    #[must_use]
    pub const fn message_target(&self) -> Option<MessageId> {
        match self.kind {
            FieldKind::Named(TypeRef::Message(id)) => Some(id),
            _ => None,
        }
    }

    /// Resolved enum target, if this field is enum-typed.
    #[must_use]
    pub const fn enum_target(&self) -> Option<EnumId> {
        match self.kind {
            FieldKind::Named(TypeRef::Enum(id)) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn scalar(&self) -> Option<ScalarType> {
        match self.kind {
            FieldKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }
}

///
/// FieldKind
///

#[derive(Clone, Debug, Serialize)]
pub enum FieldKind {
    Scalar(ScalarType),

    /// Reference to a message or enum declared somewhere in the graph.
    Named(TypeRef),

    /// Legacy group type; carried through but never key- or
    /// relation-eligible.
    Group(String),
}

///
/// TypeRef
///
/// Explicit unresolved/resolved states instead of a nilable pointer:
/// forward references across files are legal, so every named reference is
/// `Unresolved` until all files have been indexed.
///

#[derive(Clone, Debug, Serialize)]
pub enum TypeRef {
    Unresolved(String),
    Message(MessageId),
    Enum(EnumId),
}

impl TypeRef {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved(_))
    }
}
