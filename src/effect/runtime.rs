//! Explicit runtime context for asynchronous interpretation.
//!
//! A [`Runtime`] wraps a tokio runtime handle and is passed by reference
//! into every asynchronous execution call. The interpreter consults no
//! hidden global state: racing and parallel nodes spawn their
//! sub-interpretations on exactly the handle the caller supplied.
//!
//! A lazily-initialized global multi-thread runtime is available through
//! [`Runtime::global`] for callers that have no runtime of their own (for
//! example synchronous `main` functions); using it is an explicit choice,
//! not an ambient default.
//!
//! # Examples
//!
//! ```rust,ignore
//! use effectual::effect::{Effect, Runtime};
//!
//! #[tokio::main]
//! async fn main() {
//!     let runtime = Runtime::current().expect("inside a tokio runtime");
//!     let result = runtime.run(Effect::pure(42)).await;
//!     assert_eq!(result, Ok(42));
//! }
//! ```

use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, RuntimeFlavor};

use super::description::{Effect, finish};
use super::failure::Failure;
use super::interpreter;

/// Global tokio runtime initialized lazily on first access.
///
/// Configured with a multi-thread scheduler, worker threads equal to the
/// number of CPU cores, and all features enabled. It has static lifetime and
/// is never dropped.
static GLOBAL_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .expect("failed to create global tokio runtime")
});

/// The execution context for asynchronous interpretation.
///
/// Cheap to clone (wraps a [`Handle`]).
#[derive(Debug, Clone)]
pub struct Runtime {
    handle: Handle,
}

impl Runtime {
    /// Wraps an existing runtime handle.
    pub const fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// The runtime the current thread is running inside, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    /// The lazily-initialized global multi-thread runtime.
    pub fn global() -> Self {
        Self::from_handle(GLOBAL_RUNTIME.handle().clone())
    }

    /// The underlying tokio handle.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs an effect on the asynchronous interpreter.
    ///
    /// Produces exactly one terminal outcome per call. Parallel nodes spawn
    /// their sub-interpretations on this runtime's handle.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the run.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let runtime = Runtime::current().expect("inside a tokio runtime");
    /// assert_eq!(runtime.run(Effect::pure(42)).await, Ok(42));
    /// ```
    pub async fn run<A: Send + 'static>(&self, effect: Effect<A>) -> Result<A, Failure> {
        interpreter::run_async_erased(self.handle.clone(), effect.repr)
            .await
            .and_then(finish::<A>)
    }

    /// Runs an effect asynchronously, blocking the current thread for the
    /// result.
    ///
    /// - Inside a multi-thread tokio runtime: uses `block_in_place` with the
    ///   current handle, avoiding nested-runtime panics.
    /// - Inside a current-thread runtime: fails with [`Failure::Misuse`]
    ///   (`block_in_place` is not supported there).
    /// - Outside any runtime: drives the future on the global runtime.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the run, or a `Misuse` failure when
    /// blocking execution is impossible in the current context.
    pub fn run_blocking<A: Send + 'static>(&self, effect: Effect<A>) -> Result<A, Failure> {
        if let Ok(current) = Handle::try_current() {
            match current.runtime_flavor() {
                RuntimeFlavor::MultiThread => {
                    tokio::task::block_in_place(|| current.block_on(self.run(effect)))
                }
                _ => Err(Failure::misuse(
                    "run_blocking requires a multi-thread runtime or no runtime at all",
                )),
            }
        } else {
            GLOBAL_RUNTIME.block_on(self.run(effect))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn global_returns_a_usable_handle() {
        let runtime = Runtime::global();
        assert_eq!(runtime.run_blocking(Effect::pure(42)), Ok(42));
    }

    #[rstest]
    fn current_is_none_outside_a_runtime() {
        assert!(Runtime::current().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn current_is_some_inside_a_runtime() {
        let runtime = Runtime::current();
        assert!(runtime.is_some());
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn run_blocking_fails_in_current_thread_runtime() {
        let runtime = Runtime::current().expect("inside a tokio runtime");
        let result = runtime.run_blocking(Effect::pure(1));
        assert!(matches!(result, Err(Failure::Misuse(_))));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_blocking_works_in_multi_thread_runtime() {
        let runtime = Runtime::current().expect("inside a tokio runtime");
        let result = tokio::task::spawn_blocking(move || runtime.run_blocking(Effect::pure(7)))
            .await
            .unwrap();
        assert_eq!(result, Ok(7));
    }
}
