//! Memoization of an effect's first outcome.
//!
//! [`Memoized`] is a cloneable handle over an effect. Every call to
//! [`Memoized::effect`] mints a fresh description; the first one to be run
//! executes the underlying effect exactly once, and every later run replays
//! the frozen outcome (success or failure alike, fatal failures included)
//! without re-executing side effects. The single execution is spent even
//! when it ends fatally; in particular, a synchronous run that reaches an
//! asynchronous node freezes `WouldBlock` as the outcome.
//!
//! When two interpretations of minted descriptions overlap, the second one
//! polls until the in-flight run records its outcome. Polling sleeps on the
//! runtime clock, so an overlapping run needs the asynchronous interpreter;
//! a purely synchronous run never overlaps with itself and never polls.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::description::Effect;
use super::failure::Failure;

/// How long a run waits between checks for an in-flight sibling's outcome.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

struct MemoSlot<A> {
    /// The not-yet-run underlying effect. Taken by the first run to reach it.
    pending: Option<Effect<A>>,
    /// The frozen outcome, once some run has produced it.
    outcome: Option<Result<A, Failure>>,
}

/// A cloneable handle replaying a single frozen outcome.
///
/// Created by [`Effect::memoize`].
pub struct Memoized<A> {
    state: Arc<Mutex<MemoSlot<A>>>,
}

impl<A> Clone for Memoized<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A> std::fmt::Debug for Memoized<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.state.lock();
        formatter
            .debug_struct("Memoized")
            .field("resolved", &guard.outcome.is_some())
            .finish_non_exhaustive()
    }
}

impl<A: Clone + Send + 'static> Memoized<A> {
    pub(crate) fn new(inner: Effect<A>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoSlot {
                pending: Some(inner),
                outcome: None,
            })),
        }
    }

    /// Mints a description that produces the frozen outcome.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::Effect;
    ///
    /// let memoized = Effect::pure(7).memoize();
    /// assert_eq!(memoized.effect().run_sync(), Ok(7));
    /// assert_eq!(memoized.effect().run_sync(), Ok(7));
    /// ```
    pub fn effect(&self) -> Effect<A> {
        let state = Arc::clone(&self.state);
        Effect::suspend(move || step(state))
    }
}

fn step<A: Clone + Send + 'static>(state: Arc<Mutex<MemoSlot<A>>>) -> Effect<A> {
    let mut guard = state.lock();
    if let Some(outcome) = guard.outcome.clone() {
        return Effect::from_result(outcome);
    }
    if let Some(inner) = guard.pending.take() {
        drop(guard);
        let record = Arc::clone(&state);
        // Fatal outcomes are captured too: the one execution is spent either
        // way, and an unrecorded outcome would leave later runs polling for
        // a result that can never arrive. The frozen failure is re-raised,
        // so fatality is still observed by every run.
        return inner.attempt_fully().flat_map(move |outcome| {
            record.lock().outcome = Some(outcome.clone());
            Effect::from_result(outcome)
        });
    }
    drop(guard);
    // Another run is executing the underlying effect right now.
    Effect::sleep(POLL_INTERVAL).then(Effect::suspend(move || step(state)))
}
