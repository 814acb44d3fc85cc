use crate::node::{EnumId, MessageId};
use serde::Serialize;

///
/// SchemaFile
///
/// One compilation unit after registration: its declared types by id plus
/// the output-module identity artifacts are emitted under.
///

#[derive(Clone, Debug, Serialize)]
pub struct SchemaFile {
    /// Input path, e.g. `acme/user.schema`.
    pub name: String,

    /// Dotted package; empty for the root package.
    pub package: String,

    pub module: ModuleIdent,

    /// Top-level and nested messages declared in this file.
    pub messages: Vec<MessageId>,

    /// Top-level and nested enums declared in this file.
    pub enums: Vec<EnumId>,
}

impl SchemaFile {
    /// Leading-dot scope prefix for names declared at file level.
    #[must_use]
    pub fn scope(&self) -> String {
        if self.package.is_empty() {
            String::new()
        } else {
            format!(".{}", self.package)
        }
    }
}

///
/// ModuleIdent
///
/// Output-module identity of a file: directory path, module name, and the
/// collision-resolved alias other modules import it under.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ModuleIdent {
    /// Output directory, derived from the input path.
    pub path: String,

    /// Module name, derived from the input file stem.
    pub name: String,

    /// Unique import alias; equals `name` unless a collision was resolved
    /// by suffixing a counter.
    pub alias: String,
}
