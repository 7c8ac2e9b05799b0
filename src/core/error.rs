//! Error types and terminal outcomes for streams, tasks and futures.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced by the reactive core.
///
/// Cancellation is a variant of its own and is never reported as a fault;
/// see [`ReactiveError::is_cancellation`].
#[derive(Debug, Clone, Error)]
pub enum ReactiveError {
    /// The operation observed cancellation (disposal or token cancel).
    #[error("operation canceled")]
    Canceled,
    /// A sequence completed without producing any element.
    #[error("sequence contains no elements")]
    EmptySequence,
    /// A user-supplied factory, selector or action failed.
    #[error("operation failed: {0}")]
    Operation(Arc<anyhow::Error>),
    /// A completion was dropped before anyone resolved it.
    #[error("completion abandoned before resolution")]
    Abandoned,
    /// A scheduler backend could not be created or used.
    #[error("scheduler error: {0}")]
    Scheduler(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReactiveError {
    /// Wrap an arbitrary error as an operation fault.
    pub fn operation(err: impl Into<anyhow::Error>) -> Self {
        Self::Operation(Arc::new(err.into()))
    }

    /// Build an operation fault from a message.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Operation(Arc::new(anyhow::anyhow!("{message}")))
    }

    /// True when this error denotes cancellation rather than a fault.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl From<anyhow::Error> for ReactiveError {
    fn from(err: anyhow::Error) -> Self {
        Self::Operation(Arc::new(err))
    }
}

/// Terminal state of a single-resolution future.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Resolved with a value.
    Value(T),
    /// Resolved with a fault.
    Fault(ReactiveError),
    /// Resolved as canceled.
    Canceled,
}

impl<T> Outcome<T> {
    /// Classify a fallible result; cancellation errors become [`Outcome::Canceled`].
    pub fn from_result(result: Result<T, ReactiveError>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(err) if err.is_cancellation() => Self::Canceled,
            Err(err) => Self::Fault(err),
        }
    }

    /// Convert into a `Result`, mapping cancellation to [`ReactiveError::Canceled`].
    ///
    /// # Errors
    ///
    /// Returns the fault, or `ReactiveError::Canceled` for a canceled outcome.
    pub fn into_result(self) -> Result<T, ReactiveError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Fault(err) => Err(err),
            Self::Canceled => Err(ReactiveError::Canceled),
        }
    }

    /// True for [`Outcome::Value`].
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// True for [`Outcome::Canceled`].
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// True for [`Outcome::Fault`].
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}
