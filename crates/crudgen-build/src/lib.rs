//! Backend code generators and the generator composer.
//!
//! ## Crate layout
//! - `plan`: pure lowering from a `CrudModel` to a backend-neutral
//!   `TablePlan` (columns, insert/update plans, lookup and junction
//!   tables). Everything that can fail validation fails here.
//! - `sql`: DDL text rendering over a plan, per dialect.
//! - `memory` / `sqlite` / `postgres`: repository source generators.
//! - `compose`: fans one compilation request out to every active backend
//!   and merges the emitted artifacts.

pub mod compose;
pub mod memory;
pub mod plan;
pub mod postgres;
pub mod sql;
pub mod sqlite;

mod idents;
mod record;

pub use compose::{Artifact, ComposeError, Options, Request, compose};
pub use plan::{PlanError, TablePlan};
