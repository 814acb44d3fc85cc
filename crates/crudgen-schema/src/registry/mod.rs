mod resolve;

use crate::{
    MAX_ALIAS_ATTEMPTS,
    descriptor::{EnumDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor, TypeDescriptor},
    node::{
        Enum, EnumId, EnumVariant, Field, FieldKind, FileId, Message, MessageId, ModuleIdent,
        SchemaFile, TypeRef,
    },
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("file '{name}' registered twice")]
    DuplicateFile { name: String },

    #[error("type name '{fqn}' registered twice")]
    DuplicateTypeName { fqn: String },

    #[error("could not reserve a module alias for file '{file}'")]
    AliasExhausted { file: String },

    #[error("file '{name}' not found")]
    FileNotFound { name: String },

    #[error("message '{name}' not found in scope '{scope}'")]
    MessageNotFound { scope: String, name: String },

    #[error("field '{field}' of message '{message}' references unknown type '{declared}'")]
    UnresolvedFieldType {
        message: String,
        field: String,
        declared: String,
    },
}

///
/// Registry
///
/// Closed, name-resolved graph over every schema file of one compilation
/// request. Built in two passes: index everything, then resolve named
/// field references. Immutable once `load` returns.
///

#[derive(Debug, Default)]
pub struct Registry {
    files: Vec<SchemaFile>,
    messages: Vec<Message>,
    enums: Vec<Enum>,

    files_by_name: BTreeMap<String, FileId>,
    messages_by_fqn: BTreeMap<String, MessageId>,
    enums_by_fqn: BTreeMap<String, EnumId>,

    aliases: BTreeSet<String>,
}

impl Registry {
    /// Build the cross-linked graph from a set of parsed schema files.
    ///
    /// Forward references across files are legal, so the resolve pass only
    /// starts once every file has been indexed.
    pub fn load(files: &[FileDescriptor]) -> Result<Self, RegistryError> {
        let mut registry = Self::default();

        // Pass 1: index all declarations under fully-qualified names.
        for file in files {
            registry.index_file(file)?;
        }

        // Pass 2: rewrite unresolved field references to graph ids.
        resolve::resolve_references(&mut registry)?;

        debug!(
            files = registry.files.len(),
            messages = registry.messages.len(),
            enums = registry.enums.len(),
            "registry loaded"
        );

        Ok(registry)
    }

    // ---- accessors -------------------------------------------------------

    #[must_use]
    pub fn file(&self, id: FileId) -> &SchemaFile {
        &self.files[id.0]
    }

    #[must_use]
    pub fn message(&self, id: MessageId) -> &Message {
        &self.messages[id.0]
    }

    #[must_use]
    pub fn enum_node(&self, id: EnumId) -> &Enum {
        &self.enums[id.0]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &SchemaFile)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    pub fn messages(&self) -> impl Iterator<Item = (MessageId, &Message)> {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, m)| (MessageId(i), m))
    }

    /// Return a previously loaded file by input path.
    pub fn lookup_file(&self, name: &str) -> Result<&SchemaFile, RegistryError> {
        self.files_by_name
            .get(name)
            .map(|id| self.file(*id))
            .ok_or_else(|| RegistryError::FileNotFound {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn file_id(&self, name: &str) -> Option<FileId> {
        self.files_by_name.get(name).copied()
    }

    /// Scoped message resolution, used by the analyzer for relationship
    /// targets. `scope` is a leading-dot prefix such as `.acme.identity`.
    pub fn lookup_message(&self, scope: &str, name: &str) -> Result<MessageId, RegistryError> {
        match self.resolve_named(scope, name) {
            Some(TypeRef::Message(id)) => Ok(id),
            _ => Err(RegistryError::MessageNotFound {
                scope: scope.to_string(),
                name: name.to_string(),
            }),
        }
    }

    // ---- name resolution -------------------------------------------------

    /// Resolve a declared type name relative to a scope, trying
    /// progressively shorter enclosing prefixes (`.a.b.Name`, `.a.Name`,
    /// `.Name`), the same rule qualified-name scoping uses.
    fn resolve_named(&self, scope: &str, name: &str) -> Option<TypeRef> {
        if name.starts_with('.') {
            return self.named_exact(name);
        }

        let mut prefix = scope.to_string();
        loop {
            let candidate = format!("{prefix}.{name}");
            if let Some(found) = self.named_exact(&candidate) {
                return Some(found);
            }
            if prefix.is_empty() {
                return None;
            }
            prefix.truncate(prefix.rfind('.').unwrap_or(0));
        }
    }

    fn named_exact(&self, fqn: &str) -> Option<TypeRef> {
        if let Some(id) = self.messages_by_fqn.get(fqn) {
            return Some(TypeRef::Message(*id));
        }
        self.enums_by_fqn.get(fqn).map(|id| TypeRef::Enum(*id))
    }

    // ---- pass 1: indexing ------------------------------------------------

    fn index_file(&mut self, descriptor: &FileDescriptor) -> Result<(), RegistryError> {
        if self.files_by_name.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateFile {
                name: descriptor.name.clone(),
            });
        }

        let file_id = FileId(self.files.len());
        let module = self.module_ident(&descriptor.name)?;

        self.files.push(SchemaFile {
            name: descriptor.name.clone(),
            package: descriptor.package.clone(),
            module,
            messages: Vec::new(),
            enums: Vec::new(),
        });
        self.files_by_name.insert(descriptor.name.clone(), file_id);

        let scope = self.files[file_id.0].scope();
        for message in &descriptor.messages {
            self.index_message(file_id, &scope, message)?;
        }
        for enumeration in &descriptor.enums {
            self.index_enum(file_id, &scope, enumeration)?;
        }

        debug!(file = %descriptor.name, "file indexed");

        Ok(())
    }

    fn index_message(
        &mut self,
        file: FileId,
        scope: &str,
        descriptor: &MessageDescriptor,
    ) -> Result<(), RegistryError> {
        let full_name = format!("{scope}.{}", descriptor.name);
        if self.messages_by_fqn.contains_key(&full_name) {
            return Err(RegistryError::DuplicateTypeName { fqn: full_name });
        }

        let id = MessageId(self.messages.len());
        self.messages.push(Message {
            name: descriptor.name.clone(),
            full_name: full_name.clone(),
            file,
            fields: descriptor.fields.iter().map(build_field).collect(),
            crud: descriptor.crud.clone(),
        });
        self.messages_by_fqn.insert(full_name.clone(), id);
        self.files[file.0].messages.push(id);

        // nested declarations scope under the enclosing message
        for nested in &descriptor.messages {
            self.index_message(file, &full_name, nested)?;
        }
        for nested in &descriptor.enums {
            self.index_enum(file, &full_name, nested)?;
        }

        Ok(())
    }

    fn index_enum(
        &mut self,
        file: FileId,
        scope: &str,
        descriptor: &EnumDescriptor,
    ) -> Result<(), RegistryError> {
        let full_name = format!("{scope}.{}", descriptor.name);
        if self.enums_by_fqn.contains_key(&full_name) {
            return Err(RegistryError::DuplicateTypeName { fqn: full_name });
        }

        let id = EnumId(self.enums.len());
        self.enums.push(Enum {
            name: descriptor.name.clone(),
            full_name: full_name.clone(),
            file,
            variants: descriptor
                .variants
                .iter()
                .map(|v| EnumVariant {
                    name: v.name.clone(),
                    number: v.number,
                })
                .collect(),
        });
        self.enums_by_fqn.insert(full_name, id);
        self.files[file.0].enums.push(id);

        Ok(())
    }

    // ---- output-module identity ------------------------------------------

    fn module_ident(&mut self, file_name: &str) -> Result<ModuleIdent, RegistryError> {
        let (path, stem) = split_file_name(file_name);
        let name = sanitize_module_name(stem);
        let alias = self.reserve_alias(&name, file_name)?;

        Ok(ModuleIdent { path, name, alias })
    }

    fn reserve_alias(&mut self, base: &str, file_name: &str) -> Result<String, RegistryError> {
        if self.aliases.insert(base.to_string()) {
            return Ok(base.to_string());
        }

        for counter in 2..MAX_ALIAS_ATTEMPTS {
            let candidate = format!("{base}_{counter}");
            if self.aliases.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }

        // unreachable while suffixes are unbounded below the cap
        Err(RegistryError::AliasExhausted {
            file: file_name.to_string(),
        })
    }
}

fn build_field(descriptor: &FieldDescriptor) -> Field {
    let kind = match &descriptor.ty {
        TypeDescriptor::Scalar(ty) => FieldKind::Scalar(*ty),
        TypeDescriptor::Named(name) => FieldKind::Named(TypeRef::Unresolved(name.clone())),
        TypeDescriptor::Group(name) => FieldKind::Group(name.clone()),
    };

    Field {
        name: descriptor.name.clone(),
        cardinality: descriptor.cardinality,
        kind,
        options: descriptor.options.clone(),
    }
}

// Split an input path into output directory and file stem.
fn split_file_name(name: &str) -> (String, String) {
    let (dir, base) = match name.rfind('/') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    };
    let stem = base.split('.').next().unwrap_or(base);

    (dir.to_string(), stem.to_string())
}

// Module names are lower_snake identifiers.
fn sanitize_module_name(stem: String) -> String {
    let mut out = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }

    out
}
