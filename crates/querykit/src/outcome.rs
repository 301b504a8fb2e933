//! Tri-state result wrapper returned by every execution entry point.
//!
//! Storage faults never propagate as `Err` out of an execution call. They are
//! captured into [`Outcome::Exception`] together with the original
//! [`OrmError`]. Expected negative results (nothing matched, too many rows)
//! are [`Outcome::Fail`].

use crate::error::OrmError;
use std::fmt;

/// Discriminant of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Fail,
    Exception,
}

/// Result of one execution against the database.
#[must_use]
pub enum Outcome<V> {
    /// The operation succeeded.
    Success(V),
    /// Expected negative business outcome.
    Fail(String),
    /// A fault captured from the storage layer.
    Exception { message: String, cause: OrmError },
}

impl<V> Outcome<V> {
    /// Wrap a successful value.
    pub fn success(value: V) -> Self {
        Outcome::Success(value)
    }

    /// Build a `Fail` outcome.
    ///
    /// An empty message is replaced with a generic one so that non-success
    /// outcomes always explain themselves.
    pub fn fail(message: impl Into<String>) -> Self {
        Outcome::Fail(non_empty(message.into(), "operation failed"))
    }

    /// Build an `Exception` outcome carrying the original cause.
    pub fn exception(message: impl Into<String>, cause: OrmError) -> Self {
        Outcome::Exception {
            message: non_empty(message.into(), "operation raised an exception"),
            cause,
        }
    }

    /// `Exception` outcome for a fault raised by the provider, logged at warn level.
    pub(crate) fn captured(message: &str, cause: OrmError) -> Self {
        tracing::warn!(target: "querykit.sql", error = %cause, "{message}");
        Outcome::exception(message, cause)
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::Fail(_) => OutcomeKind::Fail,
            Outcome::Exception { .. } => OutcomeKind::Exception,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Outcome::Exception { .. })
    }

    /// The failure message; `None` on success.
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Fail(message) | Outcome::Exception { message, .. } => Some(message),
        }
    }

    /// The captured cause of an `Exception` outcome.
    pub fn cause(&self) -> Option<&OrmError> {
        match self {
            Outcome::Exception { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Borrow the success value.
    pub fn value(&self) -> Option<&V> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Take the success value.
    ///
    /// # Panics
    ///
    /// Panics when called on a `Fail` or `Exception` outcome. Reading the value
    /// without checking the state first is a caller bug.
    pub fn expect_value(self) -> V {
        match self {
            Outcome::Success(value) => value,
            other => panic!(
                "attempted to read the value of a {:?} outcome: {}",
                other.kind(),
                other.message().unwrap_or_default()
            ),
        }
    }

    /// Transform the success value, keeping failures untouched.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Fail(message) => Outcome::Fail(message),
            Outcome::Exception { message, cause } => Outcome::Exception { message, cause },
        }
    }

    /// Drop the success value.
    pub fn discard(self) -> Outcome<()> {
        self.map(|_| ())
    }

    /// Convert into a plain `Result`, folding `Fail` into [`OrmError::Other`].
    pub fn into_result(self) -> Result<V, OrmError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Fail(message) => Err(OrmError::Other(message)),
            Outcome::Exception { cause, .. } => Err(cause),
        }
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

impl<V: fmt::Debug> fmt::Debug for Outcome<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(value) => f.debug_tuple("Success").field(value).finish(),
            Outcome::Fail(message) => f.debug_tuple("Fail").field(message).finish(),
            Outcome::Exception { message, cause } => f
                .debug_struct("Exception")
                .field("message", message)
                .field("cause", cause)
                .finish(),
        }
    }
}
