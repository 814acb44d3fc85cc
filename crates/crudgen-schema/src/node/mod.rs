mod crud;
mod r#enum;
mod field;
mod file;
mod message;

pub use crud::*;
pub use r#enum::*;
pub use field::*;
pub use file::*;
pub use message::*;

use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Graph ids
///
/// Messages, enums, and files live in arenas owned by the registry and are
/// addressed by index. The graph is immutable once the registry's resolve
/// pass completes.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct FileId(pub usize);

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct MessageId(pub usize);

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct EnumId(pub usize);
