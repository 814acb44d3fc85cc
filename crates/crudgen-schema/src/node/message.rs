use crate::{
    descriptor::CrudOptions,
    node::{Field, FileId},
};
use serde::Serialize;

///
/// Message
///
/// A named record type. Identity is the fully-qualified name (leading-dot
/// package plus enclosing-type path), globally unique within a run.
///

#[derive(Clone, Debug, Serialize)]
pub struct Message {
    /// Simple name, e.g. `User`.
    pub name: String,

    /// Fully-qualified name, e.g. `.acme.identity.User`.
    pub full_name: String,

    /// Owning file (non-owning back-reference).
    pub file: FileId,

    /// Fields in declaration order.
    pub fields: Vec<Field>,

    /// Raw persistence annotation; `None` means no repository is wanted.
    /// The analyzer turns this into a validated `CrudModel`.
    pub crud: Option<CrudOptions>,
}

impl Message {
    /// Scope prefix for resolving names relative to this message, i.e. the
    /// fully-qualified name without its final segment.
    #[must_use]
    pub fn scope(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(0) | None => "",
            Some(idx) => &self.full_name[..idx],
        }
    }

    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
    }
}
