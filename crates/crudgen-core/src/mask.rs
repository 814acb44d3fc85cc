use serde::{Deserialize, Serialize};

///
/// FieldMask
///
/// Set of field paths restricting which fields a Create/Update call may
/// touch. Paths are dotted: `name` covers the field and everything nested
/// under it, `profile.bio` covers only that nested field.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldMask {
    paths: Vec<String>,
}

impl FieldMask {
    #[must_use]
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether the mask selects the given field path.
    ///
    /// A mask entry selects its exact path and all nested descendants;
    /// unknown paths simply select nothing.
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        self.paths.iter().any(|p| {
            path == p
                || (path.len() > p.len()
                    && path.starts_with(p.as_str())
                    && path.as_bytes()[p.len()] == b'.')
        })
    }

    /// Whether the mask touches a top-level field at all, either directly
    /// or through a path nested under it. The in-memory store copies whole
    /// fields, so a nested mask entry selects its enclosing field.
    #[must_use]
    pub fn touches(&self, field: &str) -> bool {
        self.covers(field)
            || self.paths.iter().any(|p| {
                p.len() > field.len() && p.starts_with(field) && p.as_bytes()[field.len()] == b'.'
            })
    }
}
