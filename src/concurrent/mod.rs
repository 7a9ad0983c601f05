//! Shared-state primitives built on [`EffectCell`](crate::effect::EffectCell).
//!
//! Each primitive wraps a cell and exposes effect-returning operations, so
//! building an operation never mutates and the interpreter decides when
//! mutation happens. They demonstrate the composition pattern the cell is
//! designed for rather than adding new interpreter machinery:
//!
//! - [`Counter`]: a shared signed counter.
//! - [`Flag`]: a shared boolean with compare-and-set.
//! - [`Semaphore`]: a bounded permit pool with blocking acquisition.
//! - [`EffectQueue`]: an unbounded FIFO queue with blocking take.
//!
//! Blocking operations ([`Semaphore::acquire`], [`EffectQueue::take`]) are
//! poll loops that sleep on the runtime clock between attempts, so they need
//! the asynchronous interpreter; under the synchronous one they fail with
//! [`Failure::WouldBlock`](crate::effect::Failure::WouldBlock) as soon as
//! they would have to wait.

mod counter;
mod flag;
mod queue;
mod semaphore;

pub use counter::Counter;
pub use flag::Flag;
pub use queue::EffectQueue;
pub use semaphore::Semaphore;
