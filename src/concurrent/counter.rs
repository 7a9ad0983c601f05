//! A shared signed counter.

use crate::effect::{Effect, EffectCell};

/// A shared counter whose operations are effects.
///
/// Cloning shares the underlying state.
///
/// # Examples
///
/// ```rust
/// use effectual::concurrent::Counter;
///
/// let program = Counter::make(0).flat_map(|counter| {
///     counter
///         .increment()
///         .then(counter.increment())
///         .then(counter.add(10))
/// });
/// assert_eq!(program.run_sync(), Ok(12));
/// ```
#[derive(Clone, Debug)]
pub struct Counter {
    value: EffectCell<i64>,
}

impl Counter {
    /// Creates a counter starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self {
            value: EffectCell::new(initial),
        }
    }

    /// Creates a counter as an effect.
    pub fn make(initial: i64) -> Effect<Self> {
        Effect::delay(move || Self::new(initial))
    }

    /// Reads the current count.
    pub fn get(&self) -> Effect<i64> {
        self.value.get()
    }

    /// Overwrites the count.
    pub fn set(&self, value: i64) -> Effect<()> {
        self.value.set(value)
    }

    /// Adds one, yielding the new count.
    pub fn increment(&self) -> Effect<i64> {
        self.add(1)
    }

    /// Subtracts one, yielding the new count.
    pub fn decrement(&self) -> Effect<i64> {
        self.add(-1)
    }

    /// Adds `amount` (which may be negative), yielding the new count.
    pub fn add(&self, amount: i64) -> Effect<i64> {
        self.value.update_and_get(move |n| n.wrapping_add(amount))
    }
}
