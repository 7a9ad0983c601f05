//! Deferred effect values and their combinators.
//!
//! An [`Effect<A>`] is an immutable recipe for a computation that produces a
//! value of type `A` and may perform side effects. Building or composing an
//! effect never executes anything; execution happens only through the run
//! entry points ([`Effect::run_sync`] and [`Runtime::run`](super::Runtime::run)).
//!
//! # Design Philosophy
//!
//! Effects "describe" side effects but don't "execute" them. The description
//! is a closed tree of nodes (pure values, thunks, suspensions, asynchronous
//! completions, binds, recovery handlers, parallel nodes) that the
//! interpreter walks iteratively with an explicit continuation stack, so
//! arbitrarily deep compositions cannot overflow the native call stack.
//!
//! # Examples
//!
//! ```rust
//! use effectual::effect::Effect;
//!
//! // Create a pure effect
//! let effect = Effect::pure(42);
//! assert_eq!(effect.run_sync(), Ok(42));
//!
//! // Chain effects
//! let effect = Effect::pure(10)
//!     .map(|x| x * 2)
//!     .flat_map(|x| Effect::pure(x + 1));
//! assert_eq!(effect.run_sync(), Ok(21));
//! ```
//!
//! # Side Effect Deferral
//!
//! ```rust
//! use effectual::effect::Effect;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let executed = Arc::new(AtomicBool::new(false));
//! let executed_clone = executed.clone();
//!
//! let effect = Effect::delay(move || {
//!     executed_clone.store(true, Ordering::SeqCst);
//!     42
//! });
//!
//! // Not executed yet
//! assert!(!executed.load(Ordering::SeqCst));
//!
//! // Execute the effect
//! assert_eq!(effect.run_sync(), Ok(42));
//! assert!(executed.load(Ordering::SeqCst));
//! ```
//!
//! # Ownership Semantics
//!
//! Effects are affine values: running one consumes it. Re-running the "same"
//! computation therefore goes through either a factory (see
//! [`Effect::retry`]) or a memoization handle (see [`Effect::memoize`]),
//! which freezes the first outcome and replays it on every later run.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::control::Either;

use super::failure::Failure;
use super::interpreter;
use super::memo::Memoized;

// =============================================================================
// Erased Plumbing
// =============================================================================

/// A type-erased success value flowing through the interpreter.
pub(crate) type AnyValue = Box<dyn Any + Send>;

/// A type-erased one-shot completion callback.
pub(crate) type ErasedCallback = Box<dyn FnOnce(Result<AnyValue, Failure>) + Send>;

/// A boxed future produced by interop nodes.
pub(crate) type BoxedOutcome =
    Pin<Box<dyn Future<Output = Result<AnyValue, Failure>> + Send + 'static>>;

/// The closed sum of description nodes consumed by the interpreter.
///
/// Values flow through the tree as [`AnyValue`]; the typed [`Effect`] facade
/// installs downcasts at every seam, and a failed downcast surfaces as
/// [`Failure::Misuse`] rather than a panic.
pub(crate) enum Repr {
    /// An already-known result.
    Pure(AnyValue),
    /// A zero-argument thunk run synchronously when reached.
    Sync(Box<dyn FnOnce() -> AnyValue + Send>),
    /// Defers construction of the next node; the stack-safety valve for
    /// recursive description building.
    Suspend(Box<dyn FnOnce() -> Repr + Send>),
    /// An explicit failure.
    Fail(Failure),
    /// A one-shot completion registration.
    Async(Box<dyn FnOnce(ErasedCallback) -> Option<CancelAction> + Send>),
    /// A wrapped native future.
    Future(BoxedOutcome),
    /// Run `left`, then build the next node from its result.
    Bind {
        left: Box<Repr>,
        continuation: Box<dyn FnOnce(AnyValue) -> Repr + Send>,
    },
    /// Intercept a failure of `inner`. Ordinary handlers see only non-fatal
    /// failures; `catches_fatal` is reserved for crate-internal seams that
    /// must observe every outcome.
    Recover {
        inner: Box<Repr>,
        handler: Box<dyn FnOnce(Failure) -> Repr + Send>,
        catches_fatal: bool,
    },
    /// Run `finalizer` on every exit from `inner`, fatal failures included.
    Finalize {
        inner: Box<Repr>,
        finalizer: Box<Repr>,
    },
    /// First completion wins; the loser keeps running in the background.
    Race { left: Box<Repr>, right: Box<Repr> },
    /// Wait for both sides, then merge their results.
    Both {
        left: Box<Repr>,
        right: Box<Repr>,
        merge: Box<dyn FnOnce(AnyValue, AnyValue) -> Repr + Send>,
    },
}

impl Repr {
    pub(crate) const fn kind_name(&self) -> &'static str {
        match self {
            Self::Pure(_) => "Pure",
            Self::Sync(_) => "Sync",
            Self::Suspend(_) => "Suspend",
            Self::Fail(_) => "Fail",
            Self::Async(_) => "Async",
            Self::Future(_) => "Future",
            Self::Bind { .. } => "Bind",
            Self::Recover { .. } => "Recover",
            Self::Finalize { .. } => "Finalize",
            Self::Race { .. } => "Race",
            Self::Both { .. } => "Both",
        }
    }
}

/// Downcasts a terminal interpreter value back to its typed form.
pub(crate) fn finish<A: Send + 'static>(value: AnyValue) -> Result<A, Failure> {
    value.downcast::<A>().map(|boxed| *boxed).map_err(|_| {
        Failure::misuse("terminal value had an unexpected type; a continuation was miswired")
    })
}

// =============================================================================
// Completion Callback & Cancellation
// =============================================================================

/// The one-shot callback handed to an asynchronous completion registration.
///
/// An external asynchronous source integrates with the effect system by
/// accepting a `Callback<A>` in [`Effect::async_completion`] and firing it
/// exactly once. The exactly-once contract is enforced by move semantics:
/// every completion method consumes the callback.
///
/// # Examples
///
/// ```rust,ignore
/// use effectual::effect::{Callback, Effect};
///
/// let effect = Effect::async_completion(|callback: Callback<i32>| {
///     std::thread::spawn(move || callback.succeed(42));
///     None
/// });
/// ```
pub struct Callback<A> {
    deliver: Box<dyn FnOnce(Result<A, Failure>) + Send>,
}

impl<A: Send + 'static> Callback<A> {
    /// Fires the callback with an arbitrary outcome.
    pub fn complete(self, outcome: Result<A, Failure>) {
        (self.deliver)(outcome);
    }

    /// Fires the callback with a success value.
    pub fn succeed(self, value: A) {
        self.complete(Ok(value));
    }

    /// Fires the callback with an asynchronous failure built from `message`.
    pub fn fail(self, message: impl Into<String>) {
        self.complete(Err(Failure::asynchronous(message)));
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Callback").finish_non_exhaustive()
    }
}

/// An optional cancellation hook returned by a completion registration.
///
/// Invoking it tells the external source that the caller has abandoned
/// interest. It is informational only: the base design propagates no
/// cancellation, so the interpreter never invokes it and the losing branch
/// of a [`race`](Effect::race) or [`timeout`](Effect::timeout) runs to
/// completion in the background.
pub struct CancelAction(Box<dyn FnOnce() + Send>);

impl CancelAction {
    /// Wraps a cancellation action.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(action))
    }

    /// Invokes the cancellation action.
    pub fn cancel(self) {
        (self.0)();
    }
}

impl fmt::Debug for CancelAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CancelAction").finish_non_exhaustive()
    }
}

// =============================================================================
// Effect
// =============================================================================

/// An immutable description of a computation producing an `A`.
///
/// Construction and composition never execute anything. The interpreter
/// consumes the description and drives it to exactly one success or failure.
///
/// # Type Parameters
///
/// - `A`: The type of the value produced when the effect is run.
///
/// # Monad Laws
///
/// `Effect` satisfies the monad laws up to observable behavior:
///
/// 1. **Left Identity**: `Effect::pure(a).flat_map(f)` runs like `f(a)`
/// 2. **Right Identity**: `m.flat_map(Effect::pure)` runs like `m`
/// 3. **Associativity**: `m.flat_map(f).flat_map(g)` runs like
///    `m.flat_map(|x| f(x).flat_map(g))`
pub struct Effect<A> {
    pub(crate) repr: Repr,
    marker: PhantomData<fn() -> A>,
}

impl<A> Effect<A> {
    pub(crate) const fn from_repr(repr: Repr) -> Self {
        Self {
            repr,
            marker: PhantomData,
        }
    }
}

impl<A: Send + 'static> Effect<A> {
    /// Wraps an already-known value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// assert_eq!(Effect::pure(42).run_sync(), Ok(42));
    /// ```
    pub fn pure(value: A) -> Self {
        Self::from_repr(Repr::Pure(Box::new(value)))
    }

    /// Defers a synchronous computation.
    ///
    /// The thunk is not executed until the effect is run. A panic inside the
    /// thunk is caught by the interpreter and becomes
    /// [`Failure::Computation`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// let effect = Effect::delay(|| 10 + 20);
    /// assert_eq!(effect.run_sync(), Ok(30));
    /// ```
    pub fn delay<F>(thunk: F) -> Self
    where
        F: FnOnce() -> A + Send + 'static,
    {
        Self::from_repr(Repr::Sync(Box::new(move || Box::new(thunk()) as AnyValue)))
    }

    /// Defers construction of the next effect.
    ///
    /// This is the mechanism that keeps deeply recursive description
    /// building from growing the native call stack: each recursive step is
    /// wrapped in a suspension the interpreter unwraps iteratively.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// fn count_down(n: u64) -> Effect<u64> {
    ///     if n == 0 {
    ///         Effect::pure(0)
    ///     } else {
    ///         Effect::suspend(move || count_down(n - 1))
    ///     }
    /// }
    ///
    /// assert_eq!(count_down(100_000).run_sync(), Ok(0));
    /// ```
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Effect<A> + Send + 'static,
    {
        Self::from_repr(Repr::Suspend(Box::new(move || thunk().repr)))
    }

    /// An effect that fails with the given failure.
    pub fn fail(failure: Failure) -> Self {
        Self::from_repr(Repr::Fail(failure))
    }

    /// An effect that fails with [`Failure::Raised`] built from `message`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::{Effect, Failure};
    ///
    /// let effect: Effect<i32> = Effect::raise("nope");
    /// assert_eq!(effect.run_sync(), Err(Failure::raised("nope")));
    /// ```
    pub fn raise(message: impl Into<String>) -> Self {
        Self::fail(Failure::raised(message))
    }

    /// Lifts an already-decided outcome into an effect.
    pub fn from_result(result: Result<A, Failure>) -> Self {
        match result {
            Ok(value) => Self::pure(value),
            Err(failure) => Self::fail(failure),
        }
    }

    /// An effect backed by a one-shot completion registration.
    ///
    /// `register` is handed a [`Callback<A>`] and must arrange for it to
    /// fire exactly once, with either a success value or a failure. It may
    /// return a [`CancelAction`] the caller can invoke if it abandons
    /// interest; the interpreter itself never does (no cancellation is
    /// propagated).
    ///
    /// If the callback is dropped without firing, the run fails with
    /// [`Failure::Misuse`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use effectual::effect::{Callback, Effect};
    ///
    /// let effect = Effect::async_completion(|callback: Callback<i32>| {
    ///     std::thread::spawn(move || callback.succeed(42));
    ///     None
    /// });
    /// ```
    pub fn async_completion<F>(register: F) -> Self
    where
        F: FnOnce(Callback<A>) -> Option<CancelAction> + Send + 'static,
    {
        Self::from_repr(Repr::Async(Box::new(move |deliver: ErasedCallback| {
            let callback = Callback {
                deliver: Box::new(move |outcome: Result<A, Failure>| {
                    deliver(outcome.map(|value| Box::new(value) as AnyValue));
                }),
            };
            register(callback)
        })))
    }

    /// Wraps a native future as an effect.
    ///
    /// The future is stored unpolled; it makes progress only while the
    /// asynchronous interpreter drives the effect. The synchronous
    /// interpreter fails with [`Failure::WouldBlock`] on this node.
    pub fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Self::from_repr(Repr::Future(Box::pin(async move {
            Ok(Box::new(future.await) as AnyValue)
        })))
    }

    /// An effect that never completes.
    pub fn never() -> Self {
        Self::from_repr(Repr::Future(Box::pin(futures::future::pending())))
    }

    // =========================================================================
    // Sequencing
    // =========================================================================

    /// Transforms the result with a function.
    ///
    /// Derived from `flat_map` and `pure`; the only sequencing primitive is
    /// the bind node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// assert_eq!(Effect::pure(21).map(|x| x * 2).run_sync(), Ok(42));
    /// ```
    pub fn map<B, F>(self, function: F) -> Effect<B>
    where
        F: FnOnce(A) -> B + Send + 'static,
        B: Send + 'static,
    {
        self.flat_map(move |value| Effect::pure(function(value)))
    }

    /// Runs this effect, then builds the next effect from its result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// let effect = Effect::pure(10).flat_map(|x| Effect::pure(x * 2));
    /// assert_eq!(effect.run_sync(), Ok(20));
    /// ```
    pub fn flat_map<B, F>(self, function: F) -> Effect<B>
    where
        F: FnOnce(A) -> Effect<B> + Send + 'static,
        B: Send + 'static,
    {
        Effect::from_repr(Repr::Bind {
            left: Box::new(self.repr),
            continuation: Box::new(move |value: AnyValue| match value.downcast::<A>() {
                Ok(boxed) => function(*boxed).repr,
                Err(_) => Repr::Fail(Failure::misuse(
                    "continuation received a value of an unexpected type",
                )),
            }),
        })
    }

    /// Alias for `flat_map`.
    pub fn and_then<B, F>(self, function: F) -> Effect<B>
    where
        F: FnOnce(A) -> Effect<B> + Send + 'static,
        B: Send + 'static,
    {
        self.flat_map(function)
    }

    /// Sequences two effects, discarding the result of the first.
    ///
    /// The first effect still executes for its side effects.
    pub fn then<B>(self, next: Effect<B>) -> Effect<B>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| next)
    }

    /// Combines two effects with a function, running them in sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// let effect = Effect::pure(10).map2(Effect::pure(20), |a, b| a + b);
    /// assert_eq!(effect.run_sync(), Ok(30));
    /// ```
    pub fn map2<B, C, F>(self, other: Effect<B>, function: F) -> Effect<C>
    where
        F: FnOnce(A, B) -> C + Send + 'static,
        B: Send + 'static,
        C: Send + 'static,
    {
        self.flat_map(move |a| other.map(move |b| function(a, b)))
    }

    /// Combines two effects into a tuple, running them in sequence.
    ///
    /// For the parallel counterpart see [`Effect::both`].
    pub fn product<B>(self, other: Effect<B>) -> Effect<(A, B)>
    where
        B: Send + 'static,
    {
        self.map2(other, |a, b| (a, b))
    }

    /// Applies a wrapped function to this effect's result.
    ///
    /// The function effect runs first, then this effect.
    pub fn apply<B, F>(self, function_effect: Effect<F>) -> Effect<B>
    where
        F: FnOnce(A) -> B + Send + 'static,
        B: Send + 'static,
    {
        function_effect.flat_map(move |function| self.map(function))
    }

    // =========================================================================
    // Error Recovery
    // =========================================================================

    /// Captures the outcome as an ordinary success value.
    ///
    /// A failing effect becomes a successful effect of `Err(failure)`; a
    /// succeeding one becomes `Ok(value)`. Fatal failures
    /// ([`Failure::is_fatal`]) are not captured.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::{Effect, Failure};
    ///
    /// let effect: Effect<i32> = Effect::raise("boom");
    /// assert_eq!(
    ///     effect.attempt().run_sync(),
    ///     Ok(Err(Failure::raised("boom"))),
    /// );
    /// ```
    pub fn attempt(self) -> Effect<Result<A, Failure>> {
        self.map(Ok::<A, Failure>)
            .handle_error(|failure| Effect::pure(Err(failure)))
    }

    /// Runs `handler` instead if this effect fails.
    ///
    /// Only failures raised within this effect's own sub-tree are
    /// intercepted; fatal failures pass through untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// let effect = Effect::raise("boom").handle_error(|_| Effect::pure(7));
    /// assert_eq!(effect.run_sync(), Ok(7));
    /// ```
    pub fn handle_error<F>(self, handler: F) -> Self
    where
        F: FnOnce(Failure) -> Effect<A> + Send + 'static,
    {
        Self::from_repr(Repr::Recover {
            inner: Box::new(self.repr),
            handler: Box::new(move |failure| handler(failure).repr),
            catches_fatal: false,
        })
    }

    /// Captures every outcome, fatal failures included.
    ///
    /// Internal seams (memoization) must observe fatal outcomes to stay
    /// consistent; they re-raise the failure after recording it, so the
    /// fatal-bypass guarantee still holds for user-visible recovery.
    pub(crate) fn attempt_fully(self) -> Effect<Result<A, Failure>> {
        let reified = self.map(Ok::<A, Failure>);
        Effect::from_repr(Repr::Recover {
            inner: Box::new(reified.repr),
            handler: Box::new(|failure| Repr::Pure(Box::new(Err::<A, Failure>(failure)))),
            catches_fatal: true,
        })
    }

    /// Always runs `finalizer` after this effect, success or failure.
    ///
    /// The finalizer runs on every exit, including fatal failures such as
    /// [`Failure::WouldBlock`]. The original failure, if any, is re-raised
    /// after the finalizer runs. The finalizer's own failure surfaces only
    /// when this effect succeeded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::{Effect, Failure};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    ///
    /// let finalized = Arc::new(AtomicBool::new(false));
    /// let flag = finalized.clone();
    ///
    /// let effect: Effect<i32> = Effect::raise("boom")
    ///     .guarantee(Effect::delay(move || flag.store(true, Ordering::SeqCst)));
    ///
    /// assert_eq!(effect.run_sync(), Err(Failure::raised("boom")));
    /// assert!(finalized.load(Ordering::SeqCst));
    /// ```
    pub fn guarantee(self, finalizer: Effect<()>) -> Self {
        Self::from_repr(Repr::Finalize {
            inner: Box::new(self.repr),
            finalizer: Box::new(finalizer.repr),
        })
    }

    /// The acquire/use/always-release composition.
    ///
    /// - If `acquire` fails, neither `use_fn` nor `release` runs.
    /// - Otherwise `release` always runs, whether `use_fn` succeeds, fails,
    ///   panics, or ends in a fatal failure such as
    ///   [`Failure::WouldBlock`].
    /// - The use outcome propagates; a release failure surfaces only when
    ///   the use succeeded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// let effect = Effect::bracket(
    ///     Effect::pure("handle"),
    ///     |handle| Effect::pure(handle.len()),
    ///     |_handle| Effect::unit(),
    /// );
    /// assert_eq!(effect.run_sync(), Ok(6));
    /// ```
    pub fn bracket<R, F, G>(acquire: Effect<R>, use_fn: F, release: G) -> Self
    where
        R: Clone + Send + 'static,
        F: FnOnce(R) -> Effect<A> + Send + 'static,
        G: FnOnce(R) -> Effect<()> + Send + 'static,
    {
        acquire.flat_map(move |resource| {
            let finalizer = release(resource.clone());
            use_fn(resource).guarantee(finalizer)
        })
    }

    // =========================================================================
    // Retry
    // =========================================================================

    /// Re-runs a freshly built effect up to `max_retries` additional times
    /// on failure.
    ///
    /// Total attempts never exceed `max_retries + 1`; `max_retries == 0`
    /// behaves like a single run. Effects are affine, so re-running goes
    /// through a factory rather than the consumed value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let attempts = Arc::new(AtomicUsize::new(0));
    /// let counter = attempts.clone();
    ///
    /// let effect = Effect::retry(
    ///     move || {
    ///         let counter = counter.clone();
    ///         Effect::delay(move || counter.fetch_add(1, Ordering::SeqCst) + 1)
    ///             .flat_map(|n| {
    ///                 if n < 3 {
    ///                     Effect::raise("not yet")
    ///                 } else {
    ///                     Effect::pure(n)
    ///                 }
    ///             })
    ///     },
    ///     5,
    /// );
    ///
    /// assert_eq!(effect.run_sync(), Ok(3));
    /// assert_eq!(attempts.load(Ordering::SeqCst), 3);
    /// ```
    pub fn retry<F>(factory: F, max_retries: usize) -> Self
    where
        F: Fn() -> Effect<A> + Send + Sync + 'static,
    {
        retry_loop(Arc::new(factory), 0, max_retries, None)
    }

    /// Like [`Effect::retry`], sleeping `base_delay * 2^attempt` between
    /// attempts.
    ///
    /// The sleeps make the resulting effect asynchronous: running it through
    /// the synchronous interpreter fails with [`Failure::WouldBlock`] once
    /// the first retry sleeps.
    pub fn retry_with_backoff<F>(factory: F, max_retries: usize, base_delay: Duration) -> Self
    where
        F: Fn() -> Effect<A> + Send + Sync + 'static,
    {
        retry_loop(Arc::new(factory), 0, max_retries, Some(base_delay))
    }

    // =========================================================================
    // Parallelism (delegated to the runtime's concurrent substrate)
    // =========================================================================

    /// Completes with whichever side finishes first, tagged by side.
    ///
    /// Both sides are spawned on the runtime handle. The first completion
    /// wins, success or failure. **The loser is not stopped**: it keeps
    /// running in the background and its result is discarded. This node is
    /// asynchronous; the synchronous interpreter fails with
    /// [`Failure::WouldBlock`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use effectual::control::Either;
    /// use effectual::effect::{Effect, Runtime};
    /// use std::time::Duration;
    ///
    /// # async fn demo() {
    /// let runtime = Runtime::current().expect("inside a tokio runtime");
    /// let fast = Effect::sleep(Duration::from_millis(5)).map(|()| "fast");
    /// let slow = Effect::sleep(Duration::from_millis(500)).map(|()| "slow");
    /// let winner = runtime.run(fast.race(slow)).await;
    /// assert_eq!(winner, Ok(Either::Left("fast")));
    /// # }
    /// ```
    pub fn race<B>(self, other: Effect<B>) -> Effect<Either<A, B>>
    where
        B: Send + 'static,
    {
        let left = self.map(Either::<A, B>::Left).repr;
        let right = other.map(Either::<A, B>::Right).repr;
        Effect::from_repr(Repr::Race {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Runs both sides on the runtime handle and waits for both, yielding a
    /// pair.
    ///
    /// If either side fails, the failure propagates after both sides have
    /// finished; the left side's failure is preferred when both fail.
    pub fn both<B>(self, other: Effect<B>) -> Effect<(A, B)>
    where
        B: Send + 'static,
    {
        Effect::from_repr(Repr::Both {
            left: Box::new(self.repr),
            right: Box::new(other.repr),
            merge: Box::new(|left: AnyValue, right: AnyValue| {
                match (left.downcast::<A>(), right.downcast::<B>()) {
                    (Ok(a), Ok(b)) => Repr::Pure(Box::new((*a, *b))),
                    _ => Repr::Fail(Failure::misuse(
                        "parallel merge received values of unexpected types",
                    )),
                }
            }),
        })
    }

    /// Yields `Some(value)` if this effect finishes within `duration`,
    /// `None` otherwise.
    ///
    /// Built on [`race`](Effect::race) against a sleep, so the timed-out
    /// effect is **not stopped** on expiry; it keeps running in the
    /// background with its result discarded.
    pub fn timeout(self, duration: Duration) -> Effect<Option<A>> {
        self.race(Effect::sleep(duration)).map(|winner| match winner {
            Either::Left(value) => Some(value),
            Either::Right(()) => None,
        })
    }

    // =========================================================================
    // Memoization
    // =========================================================================

    /// Freezes this effect's first outcome behind a cloneable handle.
    ///
    /// The first run of a description minted by the handle executes the
    /// underlying effect once; every later run (even on a different
    /// interpreter run) replays the frozen outcome without re-running the
    /// side effects.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let executions = Arc::new(AtomicUsize::new(0));
    /// let counter = executions.clone();
    ///
    /// let memoized = Effect::delay(move || {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    ///     42
    /// })
    /// .memoize();
    ///
    /// assert_eq!(memoized.effect().run_sync(), Ok(42));
    /// assert_eq!(memoized.effect().run_sync(), Ok(42));
    /// assert_eq!(executions.load(Ordering::SeqCst), 1);
    /// ```
    pub fn memoize(self) -> Memoized<A>
    where
        A: Clone,
    {
        Memoized::new(self)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Runs this effect on the purely synchronous interpreter.
    ///
    /// Fails with [`Failure::WouldBlock`] the moment an asynchronous node is
    /// reached. For asynchronous effects use
    /// [`Runtime::run`](super::Runtime::run).
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the run, including `WouldBlock` for
    /// asynchronous nodes.
    pub fn run_sync(self) -> Result<A, Failure> {
        interpreter::run_sync_erased(self.repr).and_then(finish::<A>)
    }
}

impl Effect<()> {
    /// The no-op effect.
    pub fn unit() -> Self {
        Self::pure(())
    }

    /// An effect that waits for `duration` when run asynchronously.
    ///
    /// The timer is created only when the asynchronous interpreter polls the
    /// node, so building the description needs no runtime context. The
    /// synchronous interpreter fails with [`Failure::WouldBlock`] on this
    /// node.
    pub fn sleep(duration: Duration) -> Self {
        Self::from_future(async move { tokio::time::sleep(duration).await })
    }
}

impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("Effect")
            .field(&self.repr.kind_name())
            .finish()
    }
}

// =============================================================================
// Retry Loop
// =============================================================================

fn retry_loop<A, F>(
    factory: Arc<F>,
    attempt: usize,
    max_retries: usize,
    base_delay: Option<Duration>,
) -> Effect<A>
where
    A: Send + 'static,
    F: Fn() -> Effect<A> + Send + Sync + 'static,
{
    let current = (*factory)();
    current.handle_error(move |failure| {
        if attempt >= max_retries {
            Effect::fail(failure)
        } else {
            let next = Effect::suspend(move || retry_loop(factory, attempt + 1, max_retries, base_delay));
            match base_delay {
                Some(base) => {
                    // Exponential backoff: base * 2^attempt, saturating.
                    let factor = 1_u32.checked_shl(u32::try_from(attempt.min(31)).unwrap_or(31));
                    Effect::sleep(base.saturating_mul(factor.unwrap_or(u32::MAX))).then(next)
                }
                None => next,
            }
        }
    })
}
