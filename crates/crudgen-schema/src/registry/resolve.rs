use crate::{
    node::{FieldKind, TypeRef},
    registry::{Registry, RegistryError},
};
use tracing::debug;

/// Second pass: rewrite every unresolved named field reference to a graph
/// id. Runs only after all files are indexed, because relationship and
/// inline fields may reference types declared in later files.
pub(super) fn resolve_references(registry: &mut Registry) -> Result<(), RegistryError> {
    // collect first: resolution needs shared access to the whole graph
    let mut fixes: Vec<(usize, usize, TypeRef)> = Vec::new();

    for (index, message) in registry.messages.iter().enumerate() {
        // the message itself is the innermost resolution scope, so fields
        // may reference types nested inside their own message
        let scope = message.full_name.clone();

        for (field_index, field) in message.fields.iter().enumerate() {
            let FieldKind::Named(TypeRef::Unresolved(declared)) = &field.kind else {
                continue;
            };

            let resolved = registry.resolve_named(&scope, declared).ok_or_else(|| {
                RegistryError::UnresolvedFieldType {
                    message: message.full_name.clone(),
                    field: field.name.clone(),
                    declared: declared.clone(),
                }
            })?;

            fixes.push((index, field_index, resolved));
        }
    }

    let resolved = fixes.len();
    for (index, field_index, type_ref) in fixes {
        registry.messages[index].fields[field_index].kind = FieldKind::Named(type_ref);
    }

    debug!(resolved, "field references resolved");

    Ok(())
}
