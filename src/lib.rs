//! # effectual
//!
//! A deferred-effect library for Rust. Programs describe side-effecting,
//! possibly asynchronous computations as inert [`Effect`](effect::Effect)
//! values, compose them with combinators, and execute them later through a
//! single stack-safe interpreter.
//!
//! ## Overview
//!
//! - **Effects as values**: building an [`Effect`](effect::Effect) never
//!   executes anything; execution happens only through the run entry points.
//! - **Stack safety**: the interpreter is an iterative loop over an explicit
//!   continuation stack, so arbitrarily deep `flat_map` chains cannot
//!   overflow the native call stack.
//! - **Error recovery**: panics in synchronous thunks, explicit failures,
//!   and asynchronous failures are all routed through one
//!   [`Failure`](effect::Failure) taxonomy and intercepted with `attempt`,
//!   `handle_error`, `guarantee`, and `bracket`.
//! - **Resource safety**: [`Resource`](resource::Resource) composes
//!   acquire/release pairs with guaranteed, reverse-order release.
//! - **Derived primitives**: counters, flags, semaphores, and queues built
//!   purely from the mutable cell and the combinators.
//!
//! ## Example
//!
//! ```rust
//! use effectual::effect::Effect;
//!
//! let effect = Effect::pure(10)
//!     .map(|x| x * 2)
//!     .flat_map(|x| Effect::pure(x + 1));
//!
//! // Nothing has run yet; the interpreter produces the result.
//! assert_eq!(effect.run_sync(), Ok(21));
//! ```
//!
//! ## Execution Entry Points
//!
//! - [`Runtime::run`](effect::Runtime::run): asynchronous interpretation on
//!   a tokio runtime handle passed in explicitly.
//! - [`Effect::run_sync`](effect::Effect::run_sync): purely synchronous
//!   interpretation; fails with [`Failure::WouldBlock`](effect::Failure) the
//!   moment an asynchronous node is reached.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use effectual::prelude::*;
/// ```
pub mod prelude {
    pub use crate::concurrent::{Counter, EffectQueue, Flag, Semaphore};
    pub use crate::control::Either;
    pub use crate::effect::{
        Callback, CancelAction, CellWrite, Effect, EffectCell, Failure, Memoized, Runtime,
    };
    pub use crate::resource::Resource;
}

pub mod concurrent;
pub mod control;
pub mod effect;
pub mod resource;
