//! A single-slot mutable holder operated through effects.
//!
//! An [`EffectCell<A>`] owns exactly one value of type `A` at a time. Every
//! accessor returns an [`Effect`] rather than mutating immediately, so the
//! interpreter, not construction order, decides when mutation happens.
//!
//! # Concurrency Discipline
//!
//! A cell is shared by reference (cloning the cell clones the handle, not
//! the value). Operations are atomic with respect to interleaved suspension
//! points *within a single interpretation*; two independently scheduled
//! interpretations mutating the same cell must coordinate through
//! [`EffectCell::access`] or [`EffectCell::try_modify`]. The
//! compare-and-set behind `access` is stamp-based: it compares a write
//! counter, not the value, so it cannot produce false negatives for values
//! that happen to compare equal.
//!
//! # Examples
//!
//! ```rust
//! use effectual::effect::EffectCell;
//!
//! let cell = EffectCell::new(1);
//! let program = cell.update(|n| n + 1).then(cell.get());
//! assert_eq!(program.run_sync(), Ok(2));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::description::Effect;

struct Slot<A> {
    value: A,
    /// Bumped on every committed write; the identity token for `access`.
    stamp: u64,
}

/// A single-slot mutable holder whose operations are effects.
///
/// # Type Parameters
///
/// - `A`: The held value type. `Clone` is required because reads hand out
///   snapshots while the cell retains ownership.
pub struct EffectCell<A> {
    slot: Arc<Mutex<Slot<A>>>,
}

impl<A> Clone for EffectCell<A> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for EffectCell<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.slot.lock();
        formatter
            .debug_struct("EffectCell")
            .field("value", &guard.value)
            .finish_non_exhaustive()
    }
}

impl<A: Clone + Send + 'static> EffectCell<A> {
    /// Creates a cell holding `value`.
    pub fn new(value: A) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot { value, stamp: 0 })),
        }
    }

    /// Creates a cell as an effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::EffectCell;
    ///
    /// let program = EffectCell::make(5).flat_map(|cell| cell.get());
    /// assert_eq!(program.run_sync(), Ok(5));
    /// ```
    pub fn make(value: A) -> Effect<Self> {
        Effect::delay(move || Self::new(value))
    }

    /// Reads the current value.
    pub fn get(&self) -> Effect<A> {
        let slot = Arc::clone(&self.slot);
        Effect::delay(move || slot.lock().value.clone())
    }

    /// Replaces the current value.
    pub fn set(&self, value: A) -> Effect<()> {
        let slot = Arc::clone(&self.slot);
        Effect::delay(move || {
            let mut guard = slot.lock();
            guard.value = value;
            guard.stamp += 1;
        })
    }

    /// Replaces the current value, returning the previous one.
    pub fn get_and_set(&self, value: A) -> Effect<A> {
        self.modify(move |previous| (previous, value))
    }

    /// Applies `function` to the current value, storing the result.
    pub fn update<F>(&self, function: F) -> Effect<()>
    where
        F: FnOnce(A) -> A + Send + 'static,
    {
        self.modify(move |value| ((), function(value)))
    }

    /// Like [`update`](Self::update), returning the previous value.
    pub fn get_and_update<F>(&self, function: F) -> Effect<A>
    where
        F: FnOnce(A) -> A + Send + 'static,
    {
        self.modify(move |value| (value.clone(), function(value)))
    }

    /// Like [`update`](Self::update), returning the new value.
    pub fn update_and_get<F>(&self, function: F) -> Effect<A>
    where
        F: FnOnce(A) -> A + Send + 'static,
    {
        self.modify(move |value| {
            let next = function(value);
            (next.clone(), next)
        })
    }

    /// Applies `function`, storing the second component and returning the
    /// first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::EffectCell;
    ///
    /// let cell = EffectCell::new(10);
    /// let program = cell.modify(|n| (n * 2, n + 1)).product(cell.get());
    /// assert_eq!(program.run_sync(), Ok((20, 11)));
    /// ```
    pub fn modify<B, F>(&self, function: F) -> Effect<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> (B, A) + Send + 'static,
    {
        let slot = Arc::clone(&self.slot);
        Effect::delay(move || {
            let mut guard = slot.lock();
            let (output, next) = function(guard.value.clone());
            guard.value = next;
            guard.stamp += 1;
            output
        })
    }

    /// Like [`modify`](Self::modify), but `function` may decline.
    ///
    /// When `function` returns `None` the cell is left untouched and the
    /// effect yields `None`.
    pub fn try_modify<B, F>(&self, function: F) -> Effect<Option<B>>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Option<(B, A)> + Send + 'static,
    {
        let slot = Arc::clone(&self.slot);
        Effect::delay(move || {
            let mut guard = slot.lock();
            match function(guard.value.clone()) {
                Some((output, next)) => {
                    guard.value = next;
                    guard.stamp += 1;
                    Some(output)
                }
                None => None,
            }
        })
    }

    /// Takes a snapshot plus a one-shot setter that commits only if the
    /// cell is unchanged since the snapshot.
    ///
    /// This is the cell's only built-in optimistic-concurrency primitive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::effect::EffectCell;
    ///
    /// let cell = EffectCell::new(1);
    /// let program = cell
    ///     .access()
    ///     .flat_map(|(snapshot, writer)| writer.set(snapshot + 1));
    /// assert_eq!(program.run_sync(), Ok(true));
    /// assert_eq!(cell.get().run_sync(), Ok(2));
    /// ```
    pub fn access(&self) -> Effect<(A, CellWrite<A>)> {
        let slot = Arc::clone(&self.slot);
        Effect::delay(move || {
            let guard = slot.lock();
            let snapshot = guard.value.clone();
            let observed = guard.stamp;
            drop(guard);
            (
                snapshot,
                CellWrite {
                    slot,
                    observed,
                },
            )
        })
    }
}

/// A one-shot conditional writer produced by [`EffectCell::access`].
pub struct CellWrite<A> {
    slot: Arc<Mutex<Slot<A>>>,
    observed: u64,
}

impl<A: Send + 'static> CellWrite<A> {
    /// Commits `value` if the cell is unchanged since the snapshot.
    ///
    /// Yields `true` on commit, `false` if another write intervened.
    pub fn set(self, value: A) -> Effect<bool> {
        Effect::delay(move || {
            let mut guard = self.slot.lock();
            if guard.stamp == self.observed {
                guard.value = value;
                guard.stamp += 1;
                true
            } else {
                false
            }
        })
    }
}

impl<A> fmt::Debug for CellWrite<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CellWrite")
            .field("observed", &self.observed)
            .finish_non_exhaustive()
    }
}
