use std::fmt::{self, Display};

///
/// ErrorTree
///
/// Accumulates schema/modeling errors across one compilation unit so a
/// single analysis pass reports every violation instead of the first.
/// Errors are authoring mistakes: fatal, named, never retried.
///

#[derive(Debug, Default)]
pub struct ErrorTree {
    errors: Vec<String>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: impl Display) {
        self.errors.push(error.to_string());
    }

    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(String::as_str)
    }

    /// Ok when no error accumulated, otherwise the tree itself.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            return write!(f, "{}", self.errors[0]);
        }

        write!(f, "{} errors", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorTree {}

/// Push a formatted error onto an [`ErrorTree`].
#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}
