//! Integration tests for the asynchronous interpreter.
//!
//! Tests cover:
//! - Completion-callback bridging (async_completion)
//! - Wrapped futures and sleeping
//! - Racing, parallel pairs, and timeouts
//! - Finalization during unrecoverable failures
//! - Backoff retry on the runtime clock
//! - The synchronous/asynchronous boundary (WouldBlock)

use effectual::control::Either;
use effectual::effect::{Effect, Failure, Runtime};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn runtime() -> Runtime {
    Runtime::current().expect("tests run inside a tokio runtime")
}

// =============================================================================
// Completion Callbacks
// =============================================================================

mod completion_callbacks {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_async_completion_success() {
        let effect = Effect::async_completion(|callback| {
            std::thread::spawn(move || callback.succeed(42));
            None
        });
        assert_eq!(runtime().run(effect).await, Ok(42));
    }

    #[rstest]
    #[tokio::test]
    async fn test_async_completion_failure() {
        let effect: Effect<i32> = Effect::async_completion(|callback| {
            callback.fail("device unavailable");
            None
        });
        assert_eq!(
            runtime().run(effect).await,
            Err(Failure::asynchronous("device unavailable"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_async_completion_failure_is_recoverable() {
        let effect: Effect<i32> = Effect::async_completion(|callback| {
            callback.fail("transient");
            None
        })
        .handle_error(|_| Effect::pure(7));
        assert_eq!(runtime().run(effect).await, Ok(7));
    }

    #[rstest]
    #[tokio::test]
    async fn test_dropped_callback_is_misuse() {
        let effect: Effect<i32> = Effect::async_completion(|callback| {
            drop(callback);
            None
        });
        assert!(matches!(
            runtime().run(effect).await,
            Err(Failure::Misuse(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_misuse_bypasses_recovery() {
        let effect: Effect<i32> = Effect::async_completion(|callback| {
            drop(callback);
            None
        })
        .handle_error(|_| Effect::pure(0));
        assert!(matches!(
            runtime().run(effect).await,
            Err(Failure::Misuse(_))
        ));
    }
}

// =============================================================================
// Futures and Sleep
// =============================================================================

mod futures_and_sleep {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_from_future_awaits_the_future() {
        let effect = Effect::from_future(async { 10 + 20 });
        assert_eq!(runtime().run(effect).await, Ok(30));
    }

    #[rstest]
    #[tokio::test]
    async fn test_sleep_then_produce() {
        let effect = Effect::sleep(Duration::from_millis(10)).then(Effect::pure("woke"));
        assert_eq!(runtime().run(effect).await, Ok("woke"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_synchronous_program_runs_on_async_interpreter() {
        let effect = Effect::pure(1).map(|n| n + 1).flat_map(|n| Effect::pure(n * 10));
        assert_eq!(runtime().run(effect).await, Ok(20));
    }

    #[rstest]
    #[tokio::test]
    async fn test_deep_bind_chain_on_async_interpreter() {
        let effect = (0..100_000).fold(Effect::pure(0_u64), |accumulated, _| {
            accumulated.flat_map(|n| Effect::pure(n + 1))
        });
        assert_eq!(runtime().run(effect).await, Ok(100_000));
    }
}

// =============================================================================
// Race / Both / Timeout
// =============================================================================

mod race_both_timeout {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_race_first_completion_wins() {
        let slow = Effect::sleep(Duration::from_millis(200)).then(Effect::pure("slow"));
        let fast = Effect::sleep(Duration::from_millis(10)).then(Effect::pure("fast"));
        assert_eq!(
            runtime().run(slow.race(fast)).await,
            Ok(Either::Right("fast"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_race_winner_failure_propagates() {
        let slow = Effect::sleep(Duration::from_millis(200)).then(Effect::pure(1));
        let fast: Effect<i32> =
            Effect::sleep(Duration::from_millis(10)).then(Effect::raise("fast branch failed"));
        assert_eq!(
            runtime().run(slow.race(fast)).await,
            Err(Failure::raised("fast branch failed"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_race_loser_keeps_running() {
        let loser_finished = Arc::new(AtomicBool::new(false));
        let witness = loser_finished.clone();

        let slow = Effect::sleep(Duration::from_millis(50))
            .then(Effect::delay(move || witness.store(true, Ordering::SeqCst)))
            .then(Effect::pure("slow"));
        let fast = Effect::pure("fast");

        assert_eq!(
            runtime().run(fast.race(slow)).await,
            Ok(Either::Left("fast"))
        );
        assert!(!loser_finished.load(Ordering::SeqCst));

        // No cancellation is propagated: the losing branch runs to completion.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(loser_finished.load(Ordering::SeqCst));
    }

    #[rstest]
    #[tokio::test]
    async fn test_both_yields_both_results() {
        let left = Effect::sleep(Duration::from_millis(20)).then(Effect::pure(1));
        let right = Effect::sleep(Duration::from_millis(10)).then(Effect::pure(2));
        assert_eq!(runtime().run(left.both(right)).await, Ok((1, 2)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_both_runs_branches_concurrently() {
        let started = std::time::Instant::now();
        let left = Effect::sleep(Duration::from_millis(100)).then(Effect::pure(()));
        let right = Effect::sleep(Duration::from_millis(100)).then(Effect::pure(()));
        assert_eq!(runtime().run(left.both(right)).await, Ok(((), ())));
        assert!(started.elapsed() < Duration::from_millis(190));
    }

    #[rstest]
    #[tokio::test]
    async fn test_both_prefers_left_failure() {
        let left: Effect<i32> = Effect::raise("left failed");
        let right: Effect<i32> = Effect::raise("right failed");
        assert_eq!(
            runtime().run(left.both(right)).await,
            Err(Failure::raised("left failed"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_timeout_yields_value_in_time() {
        let effect = Effect::sleep(Duration::from_millis(10))
            .then(Effect::pure(5))
            .timeout(Duration::from_millis(500));
        assert_eq!(runtime().run(effect).await, Ok(Some(5)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_timeout_yields_none_when_late() {
        let effect = Effect::sleep(Duration::from_millis(500))
            .then(Effect::pure(5))
            .timeout(Duration::from_millis(10));
        assert_eq!(runtime().run(effect).await, Ok(None));
    }

    #[rstest]
    #[tokio::test]
    async fn test_never_with_timeout_terminates() {
        let effect = Effect::<i32>::never().timeout(Duration::from_millis(10));
        assert_eq!(runtime().run(effect).await, Ok(None));
    }
}

// =============================================================================
// Finalization Under Unrecoverable Failures
// =============================================================================

mod fatal_finalization {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_guarantee_runs_when_effect_ends_in_misuse() {
        let finalized = Arc::new(AtomicBool::new(false));
        let witness = finalized.clone();

        let effect: Effect<i32> = Effect::async_completion(|callback| {
            drop(callback);
            None
        })
        .guarantee(Effect::delay(move || witness.store(true, Ordering::SeqCst)));

        assert!(matches!(
            runtime().run(effect).await,
            Err(Failure::Misuse(_))
        ));
        assert!(finalized.load(Ordering::SeqCst));
    }

    #[rstest]
    #[tokio::test]
    async fn test_bracket_releases_when_use_ends_in_misuse() {
        let released = Arc::new(AtomicBool::new(false));
        let witness = released.clone();

        let effect: Effect<i32> = Effect::bracket(
            Effect::pure(()),
            |()| {
                Effect::async_completion(|callback| {
                    drop(callback);
                    None
                })
            },
            move |()| Effect::delay(move || witness.store(true, Ordering::SeqCst)),
        );

        assert!(matches!(
            runtime().run(effect).await,
            Err(Failure::Misuse(_))
        ));
        assert!(released.load(Ordering::SeqCst));
    }

    #[rstest]
    #[tokio::test]
    async fn test_with_permit_restores_permit_when_body_ends_in_misuse() {
        use effectual::concurrent::Semaphore;

        let semaphore = Semaphore::new(1);
        let body: Effect<i32> = Effect::async_completion(|callback| {
            drop(callback);
            None
        });
        let program = semaphore.with_permit(body);

        assert!(matches!(
            runtime().run(program).await,
            Err(Failure::Misuse(_))
        ));
        assert_eq!(runtime().run(semaphore.available()).await, Ok(1));
    }
}

// =============================================================================
// Backoff Retry
// =============================================================================

mod backoff_retry {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_retry_with_backoff_eventually_succeeds() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let effect = Effect::retry_with_backoff(
            move || {
                let counter = counter.clone();
                Effect::delay(move || counter.fetch_add(1, Ordering::SeqCst) + 1).flat_map(|n| {
                    if n < 3 {
                        Effect::raise("transient")
                    } else {
                        Effect::pure(n)
                    }
                })
            },
            5,
            Duration::from_millis(1),
        );

        assert_eq!(runtime().run(effect).await, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn test_retry_with_backoff_waits_between_attempts() {
        let counter = Arc::new(AtomicUsize::new(0));
        let attempts = counter.clone();

        let started = std::time::Instant::now();
        let effect: Effect<i32> = Effect::retry_with_backoff(
            move || {
                let attempts = attempts.clone();
                Effect::delay(move || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                })
                .then(Effect::raise("always"))
            },
            2,
            Duration::from_millis(20),
        );

        assert_eq!(runtime().run(effect).await, Err(Failure::raised("always")));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // Delays of 20ms then 40ms separate the three attempts.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}

// =============================================================================
// Synchronous Boundary
// =============================================================================

mod synchronous_boundary {
    use super::*;

    #[rstest]
    fn test_sync_interpreter_rejects_sleep() {
        let effect = Effect::sleep(Duration::from_millis(1));
        assert_eq!(effect.run_sync(), Err(Failure::WouldBlock));
    }

    #[rstest]
    fn test_sync_interpreter_rejects_race() {
        let effect = Effect::pure(1).race(Effect::pure(2));
        assert_eq!(effect.run_sync(), Err(Failure::WouldBlock));
    }

    #[rstest]
    fn test_sync_interpreter_rejects_both() {
        let effect = Effect::pure(1).both(Effect::pure(2));
        assert_eq!(effect.run_sync(), Err(Failure::WouldBlock));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_blocking_inside_multi_thread_runtime() {
        let runtime = runtime();
        let result =
            tokio::task::spawn_blocking(move || runtime.run_blocking(Effect::pure(11))).await;
        assert_eq!(result.unwrap(), Ok(11));
    }
}
