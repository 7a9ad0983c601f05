//! Integration tests for the effect cell.
//!
//! Tests cover:
//! - Read/write/modify through composed programs
//! - Optimistic concurrency through access
//! - Sharing a cell between parallel interpretations

use effectual::effect::{Effect, EffectCell, Runtime};
use rstest::rstest;

fn runtime() -> Runtime {
    Runtime::current().expect("tests run inside a tokio runtime")
}

// =============================================================================
// Basic Operations
// =============================================================================

mod basic_operations {
    use super::*;

    #[rstest]
    fn test_composed_updates_apply_in_order() {
        let cell = EffectCell::new(1);
        let program = cell
            .update(|n| n + 1)
            .then(cell.update(|n| n * 10))
            .then(cell.get());
        assert_eq!(program.run_sync(), Ok(20));
    }

    #[rstest]
    fn test_modify_produces_output_distinct_from_state() {
        let cell = EffectCell::new("state".to_string());
        let program = cell
            .modify(|current| (current.len(), format!("{current}!")))
            .product(cell.get());
        assert_eq!(program.run_sync(), Ok((5, "state!".to_string())));
    }

    #[rstest]
    fn test_try_modify_applies_conditionally() {
        let cell = EffectCell::new(5);
        let take_if_positive = |cell: &EffectCell<i32>| {
            cell.try_modify(|n| if n > 0 { Some((n, n - 1)) } else { None })
        };

        assert_eq!(take_if_positive(&cell).run_sync(), Ok(Some(5)));
        assert_eq!(cell.get().run_sync(), Ok(4));
    }
}

// =============================================================================
// Optimistic Concurrency
// =============================================================================

mod optimistic_concurrency {
    use super::*;

    #[rstest]
    fn test_access_set_is_single_shot_and_conditional() {
        let cell = EffectCell::new(10);
        let program = cell.access().flat_map({
            let cell = cell.clone();
            move |(snapshot, writer)| {
                // A write lands between snapshot and commit.
                cell.update(|n| n + 1).then(writer.set(snapshot * 2))
            }
        });
        assert_eq!(program.run_sync(), Ok(false));
        assert_eq!(cell.get().run_sync(), Ok(11));
    }

    #[rstest]
    fn test_access_retry_loop_converges() {
        fn compare_and_swap_loop(cell: EffectCell<i32>) -> Effect<i32> {
            cell.access().flat_map({
                let cell = cell.clone();
                move |(snapshot, writer)| {
                    writer.set(snapshot + 1).flat_map(move |committed| {
                        if committed {
                            Effect::pure(snapshot + 1)
                        } else {
                            Effect::suspend(move || compare_and_swap_loop(cell))
                        }
                    })
                }
            })
        }

        let cell = EffectCell::new(0);
        assert_eq!(compare_and_swap_loop(cell.clone()).run_sync(), Ok(1));
        assert_eq!(cell.get().run_sync(), Ok(1));
    }
}

// =============================================================================
// Sharing
// =============================================================================

mod sharing {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_cell_shared_between_parallel_branches() {
        let cell = EffectCell::new(0);
        let bump = |cell: &EffectCell<i32>| cell.update(|n| n + 1);

        let program = bump(&cell).both(bump(&cell)).then(cell.get());
        assert_eq!(runtime().run(program).await, Ok(2));
    }
}
