//! The effect system: deferred computations, combinators, and interpreters.
//!
//! # Building Blocks
//!
//! - [`Effect`]: an immutable description of a possibly side-effecting,
//!   possibly asynchronous computation. Building one never executes
//!   anything.
//! - [`Failure`]: the closed taxonomy of everything that can end a run
//!   unsuccessfully.
//! - [`Runtime`]: the explicit execution context for asynchronous
//!   interpretation.
//! - [`EffectCell`]: a single-slot mutable holder whose every operation is
//!   itself an effect, so mutation timing is controlled by the interpreter.
//! - [`Memoized`]: a cloneable handle that freezes an effect's first
//!   outcome and replays it on every later run.
//!
//! # Example
//!
//! ```rust
//! use effectual::effect::{Effect, EffectCell};
//!
//! let program = EffectCell::make(0).flat_map(|cell| {
//!     cell.update(|n| n + 1)
//!         .then(cell.update(|n| n * 10))
//!         .then(cell.get())
//! });
//!
//! assert_eq!(program.run_sync(), Ok(10));
//! ```

mod cell;
mod description;
mod failure;
mod interpreter;
mod memo;
mod runtime;

pub use cell::{CellWrite, EffectCell};
pub use description::{Callback, CancelAction, Effect};
pub use failure::Failure;
pub use memo::Memoized;
pub use runtime::Runtime;
