//! Descriptor graph, registry, and CRUD semantic analysis.
//!
//! ## Crate layout
//! - `descriptor`: the parsed schema-file input surface (host-provided).
//! - `node`: the immutable, cross-linked graph the registry builds.
//! - `registry`: two-pass load (index, then resolve) over all files.
//! - `analyze`: persistence-annotation analysis producing `CrudModel`s.
//! - `types`: closed enum sets shared across the pipeline.

pub mod analyze;
pub mod descriptor;
pub mod error;
pub mod node;
pub mod registry;
pub mod types;

/// Name of the implicit unique-identifier group formed by the primary key.
pub const PRIMARY_UID_GROUP: &str = "primary";

/// Upper bound on output-module alias retries. Suffix counters are
/// unbounded in practice, so hitting this indicates a registry bug.
pub const MAX_ALIAS_ATTEMPTS: usize = 10_000;

use crate::{analyze::AnalyzeError, registry::RegistryError};
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        analyze::{Analysis, analyze},
        descriptor::*,
        err,
        error::ErrorTree,
        node::*,
        registry::Registry,
        types::{Backend, Cardinality, Operation, RelationKind, ScalarType},
    };
    pub use serde::{Deserialize, Serialize};
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    AnalyzeError(#[from] AnalyzeError),

    #[error(transparent)]
    RegistryError(#[from] RegistryError),
}
