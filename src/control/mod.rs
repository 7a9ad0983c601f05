//! Control structures supporting the effect system.
//!
//! Currently this module provides [`Either`], the two-case tagged union used
//! to tag the winner of a [`race`](crate::effect::Effect::race).

mod either;

pub use either::Either;
