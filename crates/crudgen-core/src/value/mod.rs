
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
};

///
/// Value
///
/// Scalar literal carried by predicate expressions and statement bind lists.
/// Timestamps are kept distinct from plain integers so that lowering can
/// bind them through a backend's native timestamp type. Signed and
/// unsigned integers compare numerically, matching how SQL backends bind
/// both through one integer column type; every other kind pair is ordered
/// by a fixed rank.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
#[remain::sorted]
pub enum Value {
    Bool(bool),
    Bytes(Vec<u8>),
    Float(f64),
    Int(i64),
    Text(String),
    Timestamp(i64),
    Uint(u64),
}

impl Value {
    /// Stable ordering rank used when comparing values of different kinds.
    /// `Int` and `Uint` share a rank; the pair itself never reaches the
    /// rank fallback because it compares numerically.
    const fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Bytes(_) => 1,
            Self::Float(_) => 2,
            Self::Int(_) | Self::Uint(_) => 3,
            Self::Text(_) => 4,
            Self::Timestamp(_) => 5,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Uint(_) => "uint",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "0x{}", hex_lower(v)),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Timestamp(v) => write!(f, "@{v}"),
            Self::Uint(v) => write!(f, "{v}"),
        }
    }
}

// float comparisons use total ordering so Value can key a BTreeMap
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Int(b)) | (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Int(a), Self::Uint(b)) => cmp_int_uint(*a, *b),
            (Self::Uint(a), Self::Int(b)) => cmp_int_uint(*b, *a).reverse(),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// Numeric comparison across signedness; negative signed values sort below
// every unsigned value.
fn cmp_int_uint(a: i64, b: u64) -> Ordering {
    u64::try_from(a).map_or(Ordering::Less, |a| a.cmp(&b))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// render bytes for error messages without pulling in a hex dependency
fn hex_lower(bytes: &[u8]) -> String {
    use fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }

    out
}
