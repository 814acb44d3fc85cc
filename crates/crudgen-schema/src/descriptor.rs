//! Parsed schema-file descriptors as delivered by the host toolchain.
//!
//! The compiler never parses schema source itself; it receives these
//! already-parsed descriptors inside one compilation request and builds
//! the cross-linked graph from them.

use crate::types::{Backend, Cardinality, Operation, RelationKind, ScalarType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

///
/// FileDescriptor
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FileDescriptor {
    /// Input path of the compilation unit, e.g. `acme/user.schema`.
    pub name: String,

    /// Dotted package, e.g. `acme.identity`. May be empty.
    #[serde(default)]
    pub package: String,

    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,

    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

///
/// MessageDescriptor
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MessageDescriptor {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// Nested message declarations.
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,

    /// Nested enum declarations.
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,

    /// Persistence annotation; absent means no repository is generated.
    #[serde(default)]
    pub crud: Option<CrudOptions>,
}

///
/// FieldDescriptor
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default)]
    pub cardinality: Cardinality,

    #[serde(rename = "type")]
    pub ty: TypeDescriptor,

    #[serde(default)]
    pub options: FieldOptions,
}

///
/// TypeDescriptor
///
/// Declared field type. Named references stay textual until the registry's
/// resolve pass classifies them as message or enum.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    Named(String),
    Group(String),
}

///
/// FieldOptions
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FieldOptions {
    /// Excluded from storage entirely.
    #[serde(default)]
    pub ignore: bool,

    /// Message-typed field flattened into the owning message's columns.
    #[serde(default)]
    pub inline: bool,

    /// Field carries a point-in-time value.
    #[serde(default)]
    pub timestamp: bool,

    #[serde(default)]
    pub relation: Option<RelationOptions>,
}

///
/// RelationOptions
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RelationOptions {
    pub kind: RelationKind,

    /// Explicit target message name; defaults to the field's declared type.
    #[serde(default)]
    pub target: Option<String>,
}

///
/// CrudOptions
///
/// Message-level persistence annotation.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CrudOptions {
    #[serde(default)]
    pub backends: BTreeSet<Backend>,

    #[serde(default)]
    pub operations: BTreeSet<Operation>,

    #[serde(default)]
    pub primary_key: Vec<String>,

    #[serde(default)]
    pub field_mask: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    /// Named unique-identifier groups beyond the implicit primary key.
    #[serde(default)]
    pub uid_groups: BTreeMap<String, Vec<String>>,
}

///
/// EnumDescriptor
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EnumDescriptor {
    pub name: String,

    #[serde(default)]
    pub variants: Vec<EnumVariantDescriptor>,
}

///
/// EnumVariantDescriptor
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EnumVariantDescriptor {
    pub name: String,
    pub number: i32,
}
