//! Runtime support shared between the generator and generated repositories.
//!
//! ## Crate layout
//! - `value`: scalar literal values carried by predicates and bind lists.
//! - `expr`: the predicate expression tree and direct evaluation.
//! - `lower`: lowering of expression trees to SQL predicate text.
//! - `mask`: field masks carried by records into Create/Update.
//! - `store`: the in-memory table runtime wrapped by generated repositories.

pub mod expr;
pub mod lower;
pub mod mask;
pub mod store;
pub mod value;

use crate::{expr::EvalError, lower::LowerError, store::StoreError};
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        expr::Expr,
        lower::{ColumnMap, Dialect, Predicate},
        mask::FieldMask,
        store::{MemTable, Record, TableSpec},
        value::Value,
    };
    pub use serde::{Deserialize, Serialize};
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    EvalError(#[from] EvalError),

    #[error(transparent)]
    LowerError(#[from] LowerError),

    #[error(transparent)]
    StoreError(#[from] StoreError),
}
