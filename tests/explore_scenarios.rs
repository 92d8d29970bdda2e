//! End-to-end exploration scenarios over the in-process runtime.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use treesweep::config::{CheckpointSettings, ExplorationSettings};
use treesweep::mode::{AllMode, FirstMode, FoundModePull, FoundModePush};
use treesweep::progress::Sum;
use treesweep::runtime::{explore, explore_with_abort, explore_with_checkpoint_file};
use treesweep::supervisor::TerminationReason;
use treesweep::tree::{balanced_choice, choice, choice_with, leaf, null, Tree};

fn one_worker() -> ExplorationSettings {
    ExplorationSettings {
        debug_validation: true,
        ..ExplorationSettings::with_workers(1)
    }
}

fn completed_sum<I: std::fmt::Debug>(reason: TerminationReason<Sum, Sum, I>) -> Sum {
    match reason {
        TerminationReason::Completed(result) => result,
        other => panic!("expected completion, got non-completed reason: {other:?}"),
    }
}

#[tokio::test]
async fn test_singleton_tree() {
    let outcome = explore(AllMode::<Sum>::new(), || leaf(Sum(7)), one_worker())
        .await
        .unwrap();
    assert_eq!(completed_sum(outcome.reason), Sum(7));
    assert!(outcome.remaining_workers.len() <= 1);
}

#[tokio::test]
async fn test_empty_tree() {
    let outcome = explore(AllMode::<Sum>::new(), || null::<Sum>(), one_worker())
        .await
        .unwrap();
    assert_eq!(completed_sum(outcome.reason), Sum(0));
}

#[tokio::test]
async fn test_four_leaves_single_worker() {
    let source = || {
        choice(
            choice(leaf(Sum(1)), leaf(Sum(2))),
            choice(leaf(Sum(3)), leaf(Sum(4))),
        )
    };
    let outcome = explore(AllMode::<Sum>::new(), source, one_worker())
        .await
        .unwrap();
    assert_eq!(completed_sum(outcome.reason), Sum(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stealing_pool_reaches_the_same_sum() {
    // 256 leaves over four workers with aggressive polling, so steals
    // happen at many different depths; the sum is scheduling independent.
    let source = || balanced_choice((1..=256).map(Sum).collect());
    let settings = ExplorationSettings {
        worker_count: 4,
        steps_between_polls: 1,
        debug_validation: true,
        ..ExplorationSettings::default()
    };
    let outcome = explore(AllMode::<Sum>::new(), source, settings)
        .await
        .unwrap();
    assert_eq!(completed_sum(outcome.reason), Sum(256 * 257 / 2));
}

#[tokio::test]
async fn test_first_mode_finds_a_witness() {
    let source = || {
        choice_with(
            || null(),
            || choice(leaf(11i64), leaf(22)),
        )
    };
    let outcome = explore(FirstMode::<i64>::new(), source, one_worker())
        .await
        .unwrap();
    match outcome.reason {
        TerminationReason::Completed(Some(witness)) => assert_eq!(witness.value, 11),
        other => panic!("expected a witness, got {other:?}"),
    }
}

#[tokio::test]
async fn test_first_mode_exhausts_without_witness() {
    let source = || choice(null::<i64>(), null());
    let outcome = explore(FirstMode::<i64>::new(), source, one_worker())
        .await
        .unwrap();
    match outcome.reason {
        TerminationReason::Completed(witness) => assert!(witness.is_none()),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_found_pull_stops_early() {
    // Four unit leaves, predicate "sum >= 3": one worker stops at the
    // third leaf no matter how the steps are batched.
    let source = || {
        choice(
            choice(leaf(Sum(1)), leaf(Sum(1))),
            choice(leaf(Sum(1)), leaf(Sum(1))),
        )
    };
    let mode = FoundModePull::new(|sum: &Sum| sum.0 >= 3);
    let outcome = explore(mode, source, one_worker()).await.unwrap();
    match outcome.reason {
        TerminationReason::Completed(found) => {
            assert!(found.satisfied);
            assert!(found.result.0 >= 3 && found.result.0 <= 4);
        }
        other => panic!("expected found-completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_found_push_streams_partial_results() {
    let source = || balanced_choice(vec![Sum(1); 16]);
    let mode = FoundModePush::new(|sum: &Sum| sum.0 >= 5);
    let settings = ExplorationSettings {
        steps_between_polls: 2,
        ..ExplorationSettings::with_workers(1)
    };
    let outcome = explore(mode, source, settings).await.unwrap();
    match outcome.reason {
        TerminationReason::Completed(found) => {
            assert!(found.satisfied);
            assert!(found.result.0 >= 5 && found.result.0 <= 16);
        }
        other => panic!("expected found-completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_user_panic_fails_the_run() {
    let source = || {
        choice_with(
            || leaf(Sum(1)),
            || -> Tree<Sum> { panic!("boom in user code") },
        )
    };
    let outcome = explore(AllMode::<Sum>::new(), source, one_worker())
        .await
        .unwrap();
    match outcome.reason {
        TerminationReason::Failure { message, .. } => {
            assert!(message.contains("boom in user code"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abort_reports_partial_progress() {
    // A tree too large to finish: abort must end the run promptly with an
    // aborted outcome.
    fn endless(depth: u32) -> Tree<Sum> {
        if depth == 0 {
            leaf(Sum(1))
        } else {
            choice_with(move || endless(depth - 1), move || endless(depth - 1))
        }
    }
    let abort = CancellationToken::new();
    let trigger = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = explore_with_abort(
        AllMode::<Sum>::new(),
        || endless(48),
        ExplorationSettings::with_workers(2),
        abort,
    )
    .await
    .unwrap();
    assert!(matches!(
        outcome.reason,
        TerminationReason::Aborted { .. }
    ));
}

fn scratch_checkpoint_path(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("treesweep_scenario_{name}_{nanos}.ckpt"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_checkpoint_file_resume_completes_the_sum() {
    let path = scratch_checkpoint_path("resume");
    let source = || balanced_choice((1..=4096).map(Sum).collect());
    let expected = Sum(4096 * 4097 / 2);

    // First run: aggressive updates and checkpoints, aborted mid-flight.
    let abort = CancellationToken::new();
    let trigger = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });
    let settings = ExplorationSettings {
        worker_count: 2,
        steps_between_polls: 4,
        progress_update_interval: Duration::from_millis(1),
        ..ExplorationSettings::default()
    };
    let first = explore_with_checkpoint_file(
        AllMode::<Sum>::new(),
        source,
        settings.clone(),
        CheckpointSettings {
            path: path.clone(),
            interval: Duration::ZERO,
        },
        abort,
    )
    .await
    .unwrap();

    match first.reason {
        // The abort landed mid-run: a checkpoint file must exist and the
        // second run picks up from it.
        TerminationReason::Aborted { .. } => assert!(path.exists()),
        // A small machine can finish 4096 leaves inside 30ms; then the
        // file is already gone and there is nothing to resume.
        TerminationReason::Completed(result) => {
            assert_eq!(result, expected);
            assert!(!path.exists());
            return;
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // Second run: resumes and finishes; the total includes the progress
    // recorded by the first run exactly once.
    let second = explore_with_checkpoint_file(
        AllMode::<Sum>::new(),
        source,
        settings,
        CheckpointSettings {
            path: path.clone(),
            interval: Duration::from_millis(5),
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(completed_sum(second.reason), expected);
    assert!(!path.exists(), "completion removes the checkpoint file");
}
