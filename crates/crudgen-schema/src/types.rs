use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};

///
/// Cardinality
///

#[derive(
    Clone, Copy, Default, Debug, Deserialize, Display, Eq, FromStr, PartialEq, Serialize,
)]
pub enum Cardinality {
    #[default]
    One,
    Opt,
    Many,
}

impl Cardinality {
    /// Repeated fields are containers and cannot key anything.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Many)
    }
}

///
/// ScalarType
///
/// Scalar wire types a field may declare. Message, enum, and group types
/// are named references, not scalars.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[remain::sorted]
pub enum ScalarType {
    Bool,
    Bytes,
    Double,
    Float,
    Int32,
    Int64,
    String,
    Uint32,
    Uint64,
}

impl ScalarType {
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Double | Self::Float)
    }

    /// Whether the scalar can participate in a key column: needs plain
    /// equality/ordering semantics and an unambiguous DDL representation.
    #[must_use]
    pub const fn supports_key(self) -> bool {
        !matches!(self, Self::Bool | Self::Double | Self::Float)
    }
}

///
/// Operation
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[remain::sorted]
pub enum Operation {
    Create,
    Delete,
    Read,
    Update,
}

impl Operation {
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Create, Self::Delete, Self::Read, Self::Update]
    }
}

///
/// Backend
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[remain::sorted]
pub enum Backend {
    Memory,
    Postgres,
    Sqlite,
}

impl Backend {
    #[must_use]
    pub const fn is_sql(self) -> bool {
        matches!(self, Self::Postgres | Self::Sqlite)
    }
}

///
/// RelationKind
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[remain::sorted]
pub enum RelationKind {
    ManyToMany,
    ManyToOne,
    OneToMany,
    OneToOne,
}

impl RelationKind {
    /// Kinds stored as a single local column referencing the target's
    /// minimal unique identifier.
    #[must_use]
    pub const fn stores_local_column(self) -> bool {
        matches!(self, Self::ManyToOne | Self::OneToOne)
    }

    /// Kinds materialized as a junction table at DDL-generation time.
    #[must_use]
    pub const fn needs_junction_table(self) -> bool {
        matches!(self, Self::ManyToMany)
    }
}
