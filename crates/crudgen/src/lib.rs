//! ## Crate layout
//! - `schema`: descriptor data model, registry, and crud analysis.
//! - `core`: run-time support for generated repositories (expression IR,
//!   lowering, field masks, in-memory store).
//! - `build`: generation plans, backend generators, and the composer.
//!
//! The `prelude` module mirrors the surface a generator host touches;
//! generated code itself addresses `::crudgen::core` paths only.

pub use crudgen_build as build;
pub use crudgen_core as core;
pub use crudgen_schema as schema;

// export so generated code compiles inside this workspace's tests
extern crate self as crudgen;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crudgen_build::compose;

///
/// Host Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{
        build::{Artifact, ComposeError, Options, Request, TablePlan, compose},
        core::{
            expr::Expr,
            lower::{ColumnMap, Dialect, Predicate, lower},
            mask::FieldMask,
            store::{MemTable, Record, StoreError, TableSpec},
            value::Value,
        },
        schema::{
            analyze::{Analysis, analyze},
            descriptor::FileDescriptor,
            registry::Registry,
            types::{Backend, Cardinality, Operation, RelationKind, ScalarType},
        },
    };
    pub use serde::{Deserialize, Serialize};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn version_matches_the_workspace_package() {
        assert_eq!(crate::VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn request_compiles_end_to_end_through_the_prelude() {
        let json = r#"{
            "files": [{
                "name": "app/user.schema",
                "package": "app",
                "messages": [{
                    "name": "User",
                    "fields": [
                        { "name": "id", "type": { "Scalar": "Uint64" } },
                        { "name": "name", "type": { "Scalar": "String" } }
                    ],
                    "crud": {
                        "backends": ["Memory", "Sqlite"],
                        "primary_key": ["id"]
                    }
                }]
            }]
        }"#;

        let request: Request = serde_json::from_str(json).unwrap();
        let artifacts = compose(&request).unwrap();

        let paths: Vec<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            ["app/user_memory.rs", "app/user_sqlite.rs", "app/user_sqlite.sql"]
        );
        assert!(artifacts[2].content.contains("CREATE TABLE \"user\""));
    }
}
