//! A shared boolean with compare-and-set.

use crate::effect::{Effect, EffectCell};

/// A shared boolean whose operations are effects.
///
/// Cloning shares the underlying state.
#[derive(Clone, Debug)]
pub struct Flag {
    state: EffectCell<bool>,
}

impl Flag {
    /// Creates a flag starting at `initial`.
    pub fn new(initial: bool) -> Self {
        Self {
            state: EffectCell::new(initial),
        }
    }

    /// Creates a flag as an effect.
    pub fn make(initial: bool) -> Effect<Self> {
        Effect::delay(move || Self::new(initial))
    }

    /// Reads the current state.
    pub fn get(&self) -> Effect<bool> {
        self.state.get()
    }

    /// Overwrites the state.
    pub fn set(&self, value: bool) -> Effect<()> {
        self.state.set(value)
    }

    /// Inverts the state, yielding the new value.
    pub fn toggle(&self) -> Effect<bool> {
        self.state.update_and_get(|current| !current)
    }

    /// Sets the state to `next` only if it currently equals `expected`.
    ///
    /// Yields `true` when the write happened.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::concurrent::Flag;
    ///
    /// let flag = Flag::new(false);
    /// assert_eq!(flag.compare_and_set(false, true).run_sync(), Ok(true));
    /// assert_eq!(flag.compare_and_set(false, true).run_sync(), Ok(false));
    /// ```
    pub fn compare_and_set(&self, expected: bool, next: bool) -> Effect<bool> {
        self.state.modify(move |current| {
            if current == expected {
                (true, next)
            } else {
                (false, current)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let flag = Flag::new(false);
        assert_eq!(flag.toggle().run_sync(), Ok(true));
        assert_eq!(flag.toggle().run_sync(), Ok(false));
    }

    #[test]
    fn test_compare_and_set_succeeds_on_match() {
        let flag = Flag::new(false);
        assert_eq!(flag.compare_and_set(false, true).run_sync(), Ok(true));
        assert_eq!(flag.get().run_sync(), Ok(true));
    }

    #[test]
    fn test_compare_and_set_leaves_state_on_mismatch() {
        let flag = Flag::new(true);
        assert_eq!(flag.compare_and_set(false, true).run_sync(), Ok(false));
        assert_eq!(flag.get().run_sync(), Ok(true));
    }
}
