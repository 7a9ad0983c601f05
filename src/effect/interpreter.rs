//! The stack-safe interpreter loop.
//!
//! One description is consumed per run and driven to exactly one success or
//! failure. The loop is iterative over an explicit continuation stack
//! (a vector of frames acting as a LIFO), never recursive on the native call
//! stack, so arbitrarily long bind chains run in constant stack space.
//!
//! # Frames
//!
//! - `Continue` frames hold the continuation of a bind node. A produced
//!   value pops the nearest `Continue` frame and feeds it.
//! - `Rescue` frames hold the handler of a recovery node. A failure unwinds
//!   the stack to the nearest eligible `Rescue` frame; on the success path
//!   they are popped and discarded.
//! - `Finalize` frames hold a pending finalizer. They run on every exit from
//!   the protected region: success, failure, and fatal failure alike.
//!
//! Fatal failures ([`Failure::is_fatal`]) are programming or integration
//! errors: they skip ordinary `Rescue` frames while unwinding, but still
//! trigger every `Finalize` frame on the way out.
//!
//! # Sync vs. Async
//!
//! Two loops run the identical state machine. The synchronous loop fails
//! with [`Failure::WouldBlock`] the moment it reaches a node that needs the
//! async runtime. The asynchronous loop awaits completion callbacks and
//! wrapped futures, and spawns parallel nodes on the runtime handle it was
//! given. Resumption after a completion always happens on a fresh executor
//! turn (tokio wakes the interpreter task; the callback never re-enters the
//! loop inline), which bounds native stack depth under chains of
//! synchronously re-entrant callbacks.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;

use smallvec::SmallVec;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use super::description::{AnyValue, ErasedCallback, Repr};
use super::failure::{Failure, panic_message};

// =============================================================================
// Continuation Stack
// =============================================================================

enum Frame {
    Continue(Box<dyn FnOnce(AnyValue) -> Repr + Send>),
    Rescue {
        handler: Box<dyn FnOnce(Failure) -> Repr + Send>,
        catches_fatal: bool,
    },
    Finalize(Repr),
}

type FrameStack = SmallVec<[Frame; 8]>;

enum Unwound {
    Next(Repr),
    Terminal(Result<AnyValue, Failure>),
}

/// Feeds a produced value to the nearest pending continuation.
fn continue_with(stack: &mut FrameStack, value: AnyValue) -> Unwound {
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Continue(continuation) => return Unwound::Next(continuation(value)),
            // A recovery scope completed without failing.
            Frame::Rescue { .. } => {}
            // Run the finalizer, then resume with the value. A finalizer
            // failure surfaces here because the protected region succeeded.
            Frame::Finalize(finalizer) => {
                return Unwound::Next(Repr::Bind {
                    left: Box::new(finalizer),
                    continuation: Box::new(move |_| Repr::Pure(value)),
                });
            }
        }
    }
    Unwound::Terminal(Ok(value))
}

/// Unwinds the stack to the nearest eligible recovery handler, running
/// finalizers on the way.
fn rescue_with(stack: &mut FrameStack, failure: Failure) -> Unwound {
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Rescue {
                handler,
                catches_fatal,
            } => {
                if catches_fatal || !failure.is_fatal() {
                    return Unwound::Next(handler(failure));
                }
            }
            // Continuations below the failure point never run.
            Frame::Continue(_) => {}
            Frame::Finalize(finalizer) => {
                return Unwound::Next(resume_failure_after(finalizer, failure));
            }
        }
    }
    Unwound::Terminal(Err(failure))
}

/// Runs `finalizer`, suppressing its own non-fatal failure, then re-raises
/// the original failure so unwinding resumes where it left off.
fn resume_failure_after(finalizer: Repr, failure: Failure) -> Repr {
    Repr::Bind {
        left: Box::new(Repr::Recover {
            inner: Box::new(finalizer),
            handler: Box::new(|_| Repr::Pure(Box::new(()))),
            catches_fatal: false,
        }),
        continuation: Box::new(move |_| Repr::Fail(failure)),
    }
}

fn run_caught_thunk(
    stack: &mut FrameStack,
    thunk: Box<dyn FnOnce() -> AnyValue + Send>,
) -> Unwound {
    match catch_unwind(AssertUnwindSafe(thunk)) {
        Ok(value) => continue_with(stack, value),
        Err(panic) => rescue_with(stack, Failure::Computation(panic_message(panic))),
    }
}

fn run_caught_suspension(
    stack: &mut FrameStack,
    thunk: Box<dyn FnOnce() -> Repr + Send>,
) -> Unwound {
    match catch_unwind(AssertUnwindSafe(thunk)) {
        Ok(next) => Unwound::Next(next),
        Err(panic) => rescue_with(stack, Failure::Computation(panic_message(panic))),
    }
}

// =============================================================================
// Synchronous Loop
// =============================================================================

/// Runs a description to completion without ever yielding.
///
/// Any node that needs the async runtime fails the run with
/// [`Failure::WouldBlock`]; the failure unwinds past ordinary recovery
/// handlers but still triggers pending finalizers.
pub(crate) fn run_sync_erased(repr: Repr) -> Result<AnyValue, Failure> {
    let mut current = repr;
    let mut stack: FrameStack = SmallVec::new();

    loop {
        let step = match current {
            Repr::Pure(value) => continue_with(&mut stack, value),
            Repr::Sync(thunk) => run_caught_thunk(&mut stack, thunk),
            Repr::Suspend(thunk) => run_caught_suspension(&mut stack, thunk),
            Repr::Fail(failure) => rescue_with(&mut stack, failure),
            Repr::Bind { left, continuation } => {
                stack.push(Frame::Continue(continuation));
                Unwound::Next(*left)
            }
            Repr::Recover {
                inner,
                handler,
                catches_fatal,
            } => {
                stack.push(Frame::Rescue {
                    handler,
                    catches_fatal,
                });
                Unwound::Next(*inner)
            }
            Repr::Finalize { inner, finalizer } => {
                stack.push(Frame::Finalize(*finalizer));
                Unwound::Next(*inner)
            }
            Repr::Async(_) | Repr::Future(_) | Repr::Race { .. } | Repr::Both { .. } => {
                rescue_with(&mut stack, Failure::WouldBlock)
            }
        };
        match step {
            Unwound::Next(next) => current = next,
            Unwound::Terminal(outcome) => return outcome,
        }
    }
}

// =============================================================================
// Asynchronous Loop
// =============================================================================

/// Boxed entry point so the loop can spawn sub-interpretations of itself.
pub(crate) fn run_async_erased(
    handle: Handle,
    repr: Repr,
) -> Pin<Box<dyn Future<Output = Result<AnyValue, Failure>> + Send>> {
    Box::pin(drive(handle, repr))
}

async fn drive(handle: Handle, repr: Repr) -> Result<AnyValue, Failure> {
    let mut current = repr;
    let mut stack: FrameStack = SmallVec::new();

    loop {
        let step = match current {
            Repr::Pure(value) => continue_with(&mut stack, value),
            Repr::Sync(thunk) => run_caught_thunk(&mut stack, thunk),
            Repr::Suspend(thunk) => run_caught_suspension(&mut stack, thunk),
            Repr::Fail(failure) => rescue_with(&mut stack, failure),
            Repr::Bind { left, continuation } => {
                stack.push(Frame::Continue(continuation));
                Unwound::Next(*left)
            }
            Repr::Recover {
                inner,
                handler,
                catches_fatal,
            } => {
                stack.push(Frame::Rescue {
                    handler,
                    catches_fatal,
                });
                Unwound::Next(*inner)
            }
            Repr::Finalize { inner, finalizer } => {
                stack.push(Frame::Finalize(*finalizer));
                Unwound::Next(*inner)
            }
            Repr::Async(register) => await_completion(&mut stack, register).await,
            Repr::Future(future) => match future.await {
                Ok(value) => continue_with(&mut stack, value),
                Err(failure) => rescue_with(&mut stack, failure),
            },
            Repr::Race { left, right } => await_race(&handle, &mut stack, left, right).await,
            Repr::Both { left, right, merge } => {
                await_both(&handle, &mut stack, left, right, merge).await
            }
        };
        match step {
            Unwound::Next(next) => current = next,
            Unwound::Terminal(outcome) => return outcome,
        }
    }
}

/// Registers a one-shot callback and parks the loop until it fires.
async fn await_completion(
    stack: &mut FrameStack,
    register: Box<dyn FnOnce(ErasedCallback) -> Option<super::CancelAction> + Send>,
) -> Unwound {
    let (sender, receiver) = oneshot::channel::<Result<AnyValue, Failure>>();
    let deliver: ErasedCallback = Box::new(move |outcome| {
        // The sender enforces single-fire; a send after the run gave up
        // (e.g. a raced timeout) is silently discarded.
        let _ = sender.send(outcome);
    });

    // The cancellation hook, if any, is informational only and dropped here:
    // no cancellation is propagated in this design.
    match catch_unwind(AssertUnwindSafe(move || register(deliver))) {
        Ok(_cancel) => {}
        Err(panic) => {
            return rescue_with(stack, Failure::Computation(panic_message(panic)));
        }
    }

    match receiver.await {
        Ok(Ok(value)) => continue_with(stack, value),
        Ok(Err(failure)) => rescue_with(stack, failure),
        Err(_) => rescue_with(
            stack,
            Failure::misuse("completion callback dropped without being invoked"),
        ),
    }
}

/// Spawns both branches and takes the first completion; the loser keeps
/// running in the background with its result discarded.
async fn await_race(
    handle: &Handle,
    stack: &mut FrameStack,
    left: Box<Repr>,
    right: Box<Repr>,
) -> Unwound {
    let (sender, mut receiver) = mpsc::channel::<Result<AnyValue, Failure>>(2);
    for branch in [left, right] {
        let sender = sender.clone();
        let sub_run = run_async_erased(handle.clone(), *branch);
        handle.spawn(async move {
            let _ = sender.send(sub_run.await).await;
        });
    }
    drop(sender);

    match receiver.recv().await {
        Some(Ok(value)) => continue_with(stack, value),
        Some(Err(failure)) => rescue_with(stack, failure),
        None => rescue_with(
            stack,
            Failure::Computation("every race branch panicked before completing".to_string()),
        ),
    }
}

/// Spawns both branches and waits for both; the left failure is preferred
/// when both fail.
async fn await_both(
    handle: &Handle,
    stack: &mut FrameStack,
    left: Box<Repr>,
    right: Box<Repr>,
    merge: Box<dyn FnOnce(AnyValue, AnyValue) -> Repr + Send>,
) -> Unwound {
    let left_task = handle.spawn(run_async_erased(handle.clone(), *left));
    let right_task = handle.spawn(run_async_erased(handle.clone(), *right));

    let left_outcome = flatten_join(left_task.await);
    let right_outcome = flatten_join(right_task.await);

    match (left_outcome, right_outcome) {
        (Ok(left_value), Ok(right_value)) => Unwound::Next(merge(left_value, right_value)),
        (Err(failure), _) | (Ok(_), Err(failure)) => rescue_with(stack, failure),
    }
}

fn flatten_join(
    joined: Result<Result<AnyValue, Failure>, tokio::task::JoinError>,
) -> Result<AnyValue, Failure> {
    match joined {
        Ok(outcome) => outcome,
        Err(join_error) => Err(Failure::Computation(format!(
            "concurrent branch panicked: {join_error}"
        ))),
    }
}
