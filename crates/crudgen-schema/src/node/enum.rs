use crate::node::FileId;
use serde::Serialize;

///
/// Enum
///

#[derive(Clone, Debug, Serialize)]
pub struct Enum {
    /// Simple name, e.g. `Status`.
    pub name: String,

    /// Fully-qualified name, e.g. `.acme.identity.Status`.
    pub full_name: String,

    /// Owning file (non-owning back-reference).
    pub file: FileId,

    pub variants: Vec<EnumVariant>,
}

///
/// EnumVariant
///

#[derive(Clone, Debug, Serialize)]
pub struct EnumVariant {
    pub name: String,
    pub number: i32,
}
