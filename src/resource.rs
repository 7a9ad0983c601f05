//! Composable acquire/release pairs.
//!
//! A [`Resource`] bundles an acquisition effect with the finalizer that
//! undoes it. Composed resources acquire outermost-first and release in
//! strict reverse order, and a finalizer runs whenever its acquisition
//! succeeded, regardless of what failed afterwards. Finalizer failures
//! never mask a use failure.
//!
//! # Examples
//!
//! ```rust
//! use effectual::effect::{Effect, EffectCell};
//! use effectual::resource::Resource;
//!
//! let log = EffectCell::new(Vec::new());
//!
//! let connection = {
//!     let log = log.clone();
//!     Resource::make(Effect::pure("conn"), move |_| {
//!         log.update(|mut events| {
//!             events.push("closed");
//!             events
//!         })
//!     })
//! };
//!
//! let program = connection.with(|name| Effect::pure(name.len()));
//! assert_eq!(program.run_sync(), Ok(4));
//! assert_eq!(log.get().run_sync(), Ok(vec!["closed"]));
//! ```

use crate::effect::Effect;

/// An effectful acquire/release pair.
///
/// Building a resource performs nothing; acquisition happens when the
/// resource is consumed through [`with`](Self::with) or
/// [`eval`](Self::eval).
pub struct Resource<A> {
    /// Yields the acquired value alongside the finalizer that undoes it.
    allocate: Effect<(A, Effect<()>)>,
}

impl<A: Send + 'static> Resource<A> {
    /// Pairs an acquisition effect with its release action.
    ///
    /// The finalizer receives a clone of the acquired value. If `acquire`
    /// fails, the release action never runs.
    pub fn make<F>(acquire: Effect<A>, release: F) -> Self
    where
        A: Clone,
        F: FnOnce(A) -> Effect<()> + Send + 'static,
    {
        Self {
            allocate: acquire.map(move |value| {
                let finalizer = release(value.clone());
                (value, finalizer)
            }),
        }
    }

    /// Lifts an effect into a resource with no release action.
    pub fn from_effect(effect: Effect<A>) -> Self {
        Self {
            allocate: effect.map(|value| (value, Effect::unit())),
        }
    }

    /// A resource that yields `value` and releases nothing.
    pub fn pure(value: A) -> Self {
        Self::from_effect(Effect::pure(value))
    }

    /// Acquires, hands the value to `use_fn`, and always releases.
    ///
    /// Releasing happens in reverse acquisition order for composed
    /// resources, on every exit from `use_fn` including fatal failures. The
    /// use outcome propagates; a finalizer failure surfaces only when
    /// everything else succeeded.
    pub fn with<B, F>(self, use_fn: F) -> Effect<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B> + Send + 'static,
    {
        self.allocate
            .flat_map(move |(value, finalizer)| use_fn(value).guarantee(finalizer))
    }

    /// Acquires and immediately releases, yielding the acquired value.
    pub fn eval(self) -> Effect<A> {
        self.with(Effect::pure)
    }

    /// Transforms the acquired value; the release action is untouched.
    pub fn map<B, F>(self, function: F) -> Resource<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        Resource {
            allocate: self
                .allocate
                .map(move |(value, finalizer)| (function(value), finalizer)),
        }
    }

    /// Builds a dependent resource; releases run inner-first.
    ///
    /// If the inner acquisition fails, the outer finalizer still runs and
    /// the acquisition failure propagates.
    pub fn flat_map<B, F>(self, function: F) -> Resource<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Resource<B> + Send + 'static,
    {
        Resource {
            allocate: self.allocate.flat_map(move |(outer_value, outer_finalizer)| {
                function(outer_value)
                    .allocate
                    .attempt_fully()
                    .flat_map(move |outcome| match outcome {
                        Ok((inner_value, inner_finalizer)) => Effect::pure((
                            inner_value,
                            sequence_finalizers(inner_finalizer, outer_finalizer),
                        )),
                        Err(failure) => outer_finalizer
                            .attempt()
                            .flat_map(move |_| Effect::fail(failure)),
                    })
            }),
        }
    }

    /// Pairs two resources; the second acquires after the first and
    /// releases before it.
    pub fn both<B: Send + 'static>(self, other: Resource<B>) -> Resource<(A, B)> {
        self.flat_map(move |first| other.map(move |second| (first, second)))
    }

    /// Alias for [`both`](Self::both).
    pub fn product<B: Send + 'static>(self, other: Resource<B>) -> Resource<(A, B)> {
        self.both(other)
    }

    /// Appends `extra` to run after this resource's own release action.
    pub fn on_finalize(self, extra: Effect<()>) -> Self {
        Self {
            allocate: self
                .allocate
                .map(move |(value, finalizer)| (value, sequence_finalizers(finalizer, extra))),
        }
    }
}

impl<A> std::fmt::Debug for Resource<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Resource").finish_non_exhaustive()
    }
}

/// Runs both finalizers unconditionally; the first failure wins.
fn sequence_finalizers(first: Effect<()>, second: Effect<()>) -> Effect<()> {
    first.attempt().flat_map(move |first_outcome| {
        second.attempt().flat_map(move |second_outcome| {
            match (first_outcome, second_outcome) {
                (Ok(()), Ok(())) => Effect::unit(),
                (Err(failure), _) | (Ok(()), Err(failure)) => Effect::fail(failure),
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectCell, Failure};

    fn tracked(
        log: &EffectCell<Vec<String>>,
        name: &'static str,
    ) -> Resource<&'static str> {
        let log = log.clone();
        Resource::make(Effect::pure(name), move |value| {
            log.update(move |mut events| {
                events.push(format!("released {value}"));
                events
            })
        })
    }

    #[test]
    fn test_release_runs_after_use() {
        let log = EffectCell::new(Vec::new());
        let program = tracked(&log, "a").with(|_| Effect::pure(1));
        assert_eq!(program.run_sync(), Ok(1));
        assert_eq!(log.get().run_sync(), Ok(vec!["released a".to_string()]));
    }

    #[test]
    fn test_composed_resources_release_in_reverse_order() {
        let log = EffectCell::new(Vec::new());
        let paired = tracked(&log, "a").both(tracked(&log, "b"));
        assert_eq!(paired.with(|pair| Effect::pure(pair)).run_sync(), Ok(("a", "b")));
        assert_eq!(
            log.get().run_sync(),
            Ok(vec!["released b".to_string(), "released a".to_string()])
        );
    }

    #[test]
    fn test_release_runs_even_when_use_fails() {
        let log = EffectCell::new(Vec::new());
        let program = tracked(&log, "a").with(|_| Effect::<i32>::raise("use failed"));
        assert_eq!(program.run_sync(), Err(Failure::raised("use failed")));
        assert_eq!(log.get().run_sync(), Ok(vec!["released a".to_string()]));
    }

    #[test]
    fn test_release_runs_when_use_would_block() {
        let log = EffectCell::new(Vec::new());
        let program = tracked(&log, "a").with(|_| Effect::<i32>::never());
        assert_eq!(program.run_sync(), Err(Failure::WouldBlock));
        assert_eq!(log.get().run_sync(), Ok(vec!["released a".to_string()]));
    }

    #[test]
    fn test_failed_acquisition_skips_its_own_release() {
        let log = EffectCell::new(Vec::new());
        let broken: Resource<&'static str> = {
            let log = log.clone();
            Resource::make(Effect::raise("acquire failed"), move |_| {
                log.update(|mut events| {
                    events.push("never".to_string());
                    events
                })
            })
        };
        let program = broken.with(|_| Effect::pure(()));
        assert_eq!(program.run_sync(), Err(Failure::raised("acquire failed")));
        assert_eq!(log.get().run_sync(), Ok(Vec::<String>::new()));
    }

    #[test]
    fn test_inner_acquisition_failure_releases_outer() {
        let log = EffectCell::new(Vec::new());
        let composed = tracked(&log, "outer").flat_map(|_| {
            Resource::<&'static str>::make(Effect::raise("inner acquire"), |_| Effect::unit())
        });
        let program = composed.with(|_| Effect::pure(()));
        assert_eq!(program.run_sync(), Err(Failure::raised("inner acquire")));
        assert_eq!(
            log.get().run_sync(),
            Ok(vec!["released outer".to_string()])
        );
    }

    #[test]
    fn test_finalizer_failure_does_not_mask_use_failure() {
        let failing: Resource<i32> =
            Resource::make(Effect::pure(1), |_| Effect::raise("release failed"));
        let program = failing.with(|_| Effect::<i32>::raise("use failed"));
        assert_eq!(program.run_sync(), Err(Failure::raised("use failed")));
    }

    #[test]
    fn test_finalizer_failure_surfaces_when_use_succeeds() {
        let failing: Resource<i32> =
            Resource::make(Effect::pure(1), |_| Effect::raise("release failed"));
        let program = failing.with(|value| Effect::pure(value));
        assert_eq!(program.run_sync(), Err(Failure::raised("release failed")));
    }

    #[test]
    fn test_on_finalize_runs_after_own_release() {
        let log = EffectCell::new(Vec::new());
        let extra = {
            let log = log.clone();
            log.update(|mut events| {
                events.push("extra".to_string());
                events
            })
        };
        let program = tracked(&log, "a").on_finalize(extra).with(|_| Effect::unit());
        assert_eq!(program.run_sync(), Ok(()));
        assert_eq!(
            log.get().run_sync(),
            Ok(vec!["released a".to_string(), "extra".to_string()])
        );
    }

    #[test]
    fn test_product_pairs_and_releases_in_reverse() {
        let log = EffectCell::new(Vec::new());
        let paired = tracked(&log, "a").product(tracked(&log, "b"));
        assert_eq!(paired.eval().run_sync(), Ok(("a", "b")));
        assert_eq!(
            log.get().run_sync(),
            Ok(vec!["released b".to_string(), "released a".to_string()])
        );
    }

    #[test]
    fn test_eval_acquires_and_releases() {
        let log = EffectCell::new(Vec::new());
        assert_eq!(tracked(&log, "a").eval().run_sync(), Ok("a"));
        assert_eq!(log.get().run_sync(), Ok(vec!["released a".to_string()]));
    }
}
