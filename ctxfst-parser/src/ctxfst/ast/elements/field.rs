//! Tri-state field values
//!
//!     A preamble value is either absent, present but unusable, or present and typed.
//!     Invalid values keep their raw text so diagnostics and tools can show it.

/// A typed preamble slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Absent,
    /// Present but failed to decode; holds the raw value as written
    Invalid(String),
    Valid(T),
}

impl<T> Field<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Field::Valid(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_valid(self) -> Option<T> {
        match self {
            Field::Valid(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Field::Invalid(_))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Field::Valid(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Absent => Field::Absent,
            Field::Invalid(raw) => Field::Invalid(raw),
            Field::Valid(value) => Field::Valid(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Valid(value),
            None => Field::Absent,
        }
    }
}
