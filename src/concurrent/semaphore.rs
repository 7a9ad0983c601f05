//! A bounded permit pool with blocking acquisition.

use std::time::Duration;

use crate::effect::{Effect, EffectCell};

/// How long an acquirer waits between permit checks.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A bounded permit pool whose operations are effects.
///
/// Cloning shares the underlying pool. [`acquire`](Self::acquire) waits for
/// a permit by polling on the runtime clock, so it needs the asynchronous
/// interpreter when it actually has to wait; [`try_acquire`](Self::try_acquire)
/// never waits. Polling is not fair: waiters acquire in no particular order.
///
/// # Examples
///
/// ```rust
/// use effectual::concurrent::Semaphore;
///
/// let semaphore = Semaphore::new(2);
/// assert_eq!(semaphore.try_acquire().run_sync(), Ok(true));
/// assert_eq!(semaphore.try_acquire().run_sync(), Ok(true));
/// assert_eq!(semaphore.try_acquire().run_sync(), Ok(false));
/// assert_eq!(semaphore.release().then(semaphore.available()).run_sync(), Ok(1));
/// ```
#[derive(Clone, Debug)]
pub struct Semaphore {
    permits: EffectCell<u64>,
    max_permits: u64,
}

impl Semaphore {
    /// Creates a pool holding `permits` permits.
    pub fn new(permits: u64) -> Self {
        Self {
            permits: EffectCell::new(permits),
            max_permits: permits,
        }
    }

    /// Creates a pool as an effect.
    pub fn make(permits: u64) -> Effect<Self> {
        Effect::delay(move || Self::new(permits))
    }

    /// The number of permits currently available.
    pub fn available(&self) -> Effect<u64> {
        self.permits.get()
    }

    /// Takes a permit without waiting, yielding whether one was taken.
    pub fn try_acquire(&self) -> Effect<bool> {
        self.permits
            .try_modify(|count| count.checked_sub(1).map(|rest| ((), rest)))
            .map(|taken| taken.is_some())
    }

    /// Takes a permit, waiting until one is available.
    pub fn acquire(&self) -> Effect<()> {
        let semaphore = self.clone();
        Effect::suspend(move || acquire_loop(semaphore))
    }

    /// Returns a permit to the pool.
    ///
    /// Capped at the pool's initial capacity: releasing more times than
    /// acquiring leaves every permit available and is otherwise a no-op.
    pub fn release(&self) -> Effect<()> {
        let max_permits = self.max_permits;
        self.permits
            .update(move |count| count.saturating_add(1).min(max_permits))
    }

    /// Runs `effect` while holding a permit, releasing it afterwards even on
    /// failure or panic.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::concurrent::Semaphore;
    /// use effectual::effect::Effect;
    ///
    /// let semaphore = Semaphore::new(1);
    /// let program = semaphore
    ///     .with_permit(Effect::pure("work"))
    ///     .then(semaphore.available());
    /// assert_eq!(program.run_sync(), Ok(1));
    /// ```
    pub fn with_permit<A: Send + 'static>(&self, effect: Effect<A>) -> Effect<A> {
        let releaser = self.clone();
        Effect::bracket(self.acquire(), move |()| effect, move |()| releaser.release())
    }
}

fn acquire_loop(semaphore: Semaphore) -> Effect<()> {
    semaphore
        .try_acquire()
        .flat_map(move |taken| {
            if taken {
                Effect::unit()
            } else {
                Effect::sleep(POLL_INTERVAL)
                    .then(Effect::suspend(move || acquire_loop(semaphore)))
            }
        })
}
