//! An unbounded FIFO queue with blocking take.

use std::collections::VecDeque;
use std::time::Duration;

use crate::effect::{Effect, EffectCell};

/// How long a taker waits between checks for an element.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// An unbounded FIFO queue whose operations are effects.
///
/// Cloning shares the underlying queue. [`take`](Self::take) waits for an
/// element by polling on the runtime clock, so it needs the asynchronous
/// interpreter when the queue is empty; [`try_take`](Self::try_take) never
/// waits.
///
/// # Examples
///
/// ```rust
/// use effectual::concurrent::EffectQueue;
///
/// let queue = EffectQueue::new();
/// let program = queue
///     .offer(1)
///     .then(queue.offer(2))
///     .then(queue.try_take());
/// assert_eq!(program.run_sync(), Ok(Some(1)));
/// ```
#[derive(Clone, Debug)]
pub struct EffectQueue<A> {
    elements: EffectCell<VecDeque<A>>,
}

impl<A: Clone + Send + 'static> EffectQueue<A> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            elements: EffectCell::new(VecDeque::new()),
        }
    }

    /// Creates an empty queue as an effect.
    pub fn make() -> Effect<Self> {
        Effect::delay(Self::new)
    }

    /// Appends `element` at the tail.
    pub fn offer(&self, element: A) -> Effect<()> {
        self.elements.update(move |mut queue| {
            queue.push_back(element);
            queue
        })
    }

    /// Appends every element of `batch` at the tail, in order.
    pub fn offer_all<I>(&self, batch: I) -> Effect<()>
    where
        I: IntoIterator<Item = A> + Send + 'static,
        I::IntoIter: Send,
    {
        self.elements.update(move |mut queue| {
            queue.extend(batch);
            queue
        })
    }

    /// Removes the head element without waiting.
    pub fn try_take(&self) -> Effect<Option<A>> {
        self.elements.modify(|mut queue| {
            let head = queue.pop_front();
            (head, queue)
        })
    }

    /// Removes the head element, waiting until one is available.
    pub fn take(&self) -> Effect<A> {
        let queue = self.clone();
        Effect::suspend(move || take_loop(queue))
    }

    /// Reads the head element without removing it.
    pub fn peek(&self) -> Effect<Option<A>> {
        self.elements.get().map(|queue| queue.front().cloned())
    }

    /// The number of queued elements.
    pub fn size(&self) -> Effect<usize> {
        self.elements.get().map(|queue| queue.len())
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> Effect<bool> {
        self.elements.get().map(|queue| queue.is_empty())
    }

    /// Removes every element at once, in FIFO order.
    pub fn take_all(&self) -> Effect<Vec<A>> {
        self.elements
            .modify(|queue| (Vec::from(queue), VecDeque::new()))
    }
}

impl<A: Clone + Send + 'static> Default for EffectQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn take_loop<A: Clone + Send + 'static>(queue: EffectQueue<A>) -> Effect<A> {
    queue.try_take().flat_map(move |head| match head {
        Some(element) => Effect::pure(element),
        None => Effect::sleep(POLL_INTERVAL).then(Effect::suspend(move || take_loop(queue))),
    })
}
