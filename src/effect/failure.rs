//! Failure taxonomy for the effect system.
//!
//! Every way an interpretation can go wrong is captured as a [`Failure`]
//! value. Failures flow through the interpreter as ordinary data: they are
//! never re-thrown as panics, and a failed run never crashes the host
//! process on its own.
//!
//! # Kinds
//!
//! - [`Failure::Computation`]: a panic escaped a synchronous thunk. The
//!   interpreter catches it and carries the panic message.
//! - [`Failure::Raised`]: raised explicitly via
//!   [`Effect::raise`](super::Effect::raise).
//! - [`Failure::Asynchronous`]: delivered through an asynchronous
//!   completion callback.
//! - [`Failure::WouldBlock`]: the synchronous interpreter reached a node
//!   that requires the async runtime.
//! - [`Failure::Misuse`]: a broken integration contract (for example a
//!   completion callback dropped without firing).
//!
//! `WouldBlock` and `Misuse` are programming or integration errors: they are
//! fatal, bypass every recovery handler, and are never retried.

use std::any::Any;
use std::fmt;

/// An opaque failure value produced during interpretation.
///
/// # Examples
///
/// ```rust
/// use effectual::effect::{Effect, Failure};
///
/// let effect: Effect<i32> = Effect::raise("out of cheese");
/// assert_eq!(
///     effect.run_sync(),
///     Err(Failure::Raised("out of cheese".to_string())),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A panic escaped a synchronous thunk; carries the panic message.
    Computation(String),
    /// A failure raised explicitly through `Effect::raise`.
    Raised(String),
    /// A failure delivered by an asynchronous completion callback.
    Asynchronous(String),
    /// The synchronous interpreter reached a node that requires the async
    /// runtime.
    WouldBlock,
    /// The interpreter detected a broken integration contract.
    Misuse(String),
}

impl Failure {
    /// Creates a `Raised` failure from any displayable message.
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }

    /// Creates an `Asynchronous` failure from any displayable message.
    pub fn asynchronous(message: impl Into<String>) -> Self {
        Self::Asynchronous(message.into())
    }

    /// Creates a `Misuse` failure from any displayable message.
    pub fn misuse(message: impl Into<String>) -> Self {
        Self::Misuse(message.into())
    }

    /// Returns `true` for failures that bypass recovery handlers.
    ///
    /// Fatal failures signal programming or integration errors; retrying or
    /// recovering from them would mask the defect, so `attempt`,
    /// `handle_error`, and `retry` let them through untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Failure;
    ///
    /// assert!(Failure::WouldBlock.is_fatal());
    /// assert!(!Failure::raised("recoverable").is_fatal());
    /// ```
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::WouldBlock | Self::Misuse(_))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Computation(message) => {
                write!(formatter, "computation panicked: {message}")
            }
            Self::Raised(message) => write!(formatter, "raised: {message}"),
            Self::Asynchronous(message) => {
                write!(formatter, "asynchronous failure: {message}")
            }
            Self::WouldBlock => write!(
                formatter,
                "synchronous interpretation reached an asynchronous node"
            ),
            Self::Misuse(message) => write!(formatter, "interpreter misuse: {message}"),
        }
    }
}

impl std::error::Error for Failure {}

/// Extracts a human-readable message from a caught panic payload.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
