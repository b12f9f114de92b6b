//! Closed result model returned by every dispatched call.
//!
//! An [`Outcome`] is always exactly one of four variants. Remote failures are
//! values, not errors: a caller that wants the success value has to match on
//! the outcome or go through [`Outcome::value`], which reports
//! [`Error::InvalidState`] for the three failure variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ACCESS_DENIED: &str = "Access denied.";
pub const REAUTHENTICATE: &str = "Access denied.  Need to reauthenticate.";
pub const UNEXPECTED_ERROR: &str = "Unexpected error has occurred.";

/// Result of a single service call
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<T> {
    /// The call succeeded and produced a value.
    Success(T),
    /// The service rejected the content of the request.
    ValidationError(Vec<String>),
    /// Authentication or authorization failed.
    AccessDenied(Vec<String>),
    /// The call failed below the application layer.
    TransportError(Vec<String>),
}

/// Variant discriminant of an [`Outcome`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    ValidationError,
    AccessDenied,
    TransportError,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::ValidationError => "validation error",
            Self::AccessDenied => "access denied",
            Self::TransportError => "transport error",
        };
        f.write_str(name)
    }
}

fn collect<I, S>(messages: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    messages.into_iter().map(Into::into).collect()
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    pub fn validation_error<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ValidationError(collect(messages))
    }

    pub fn access_denied<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AccessDenied(collect(messages))
    }

    pub fn transport_error<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::TransportError(collect(messages))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::ValidationError(_) => OutcomeKind::ValidationError,
            Self::AccessDenied(_) => OutcomeKind::AccessDenied,
            Self::TransportError(_) => OutcomeKind::TransportError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Borrow the success value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when the outcome is not a success.
    pub fn value(&self) -> Result<&T> {
        match self {
            Self::Success(value) => Ok(value),
            other => Err(Error::InvalidState { kind: other.kind() }),
        }
    }

    /// Take the success value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when the outcome is not a success.
    pub fn into_value(self) -> Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            other => Err(Error::InvalidState { kind: other.kind() }),
        }
    }

    /// Diagnostic messages carried by a failure variant. Empty for success.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Success(_) => &[],
            Self::ValidationError(messages)
            | Self::AccessDenied(messages)
            | Self::TransportError(messages) => messages,
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        self.and_then(|value| Outcome::Success(f(value)))
    }

    /// Chain a dependent step. Failure variants pass through untouched.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Self::Success(value) => f(value),
            Self::ValidationError(messages) => Outcome::ValidationError(messages),
            Self::AccessDenied(messages) => Outcome::AccessDenied(messages),
            Self::TransportError(messages) => Outcome::TransportError(messages),
        }
    }

    /// Split into a standard [`Result`](std::result::Result), keeping the
    /// failure variant intact in the error position.
    pub fn into_result(self) -> std::result::Result<T, Outcome<T>> {
        match self {
            Self::Success(value) => Ok(value),
            failure => Err(failure),
        }
    }
}
