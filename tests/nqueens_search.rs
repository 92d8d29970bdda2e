//! A realistic search: counting n-queens placements across a worker pool.
//!
//! Rows are placed one at a time; each row's column comes from a balanced
//! choice over the board width, with conflicting placements pruned to
//! dead branches. This produces the irregular, deep, heavily-pruned trees
//! the scheduler actually faces, as opposed to the uniform shapes of the
//! unit tests.

use treesweep::config::ExplorationSettings;
use treesweep::mode::{AllMode, FirstMode};
use treesweep::progress::Count;
use treesweep::runtime::explore;
use treesweep::stepper::explore_whole;
use treesweep::supervisor::TerminationReason;
use treesweep::tree::{between_then, leaf, null, Tree};

/// Occupancy masks for the rows placed so far.
#[derive(Clone, Copy)]
struct Board {
    size: i64,
    row: i64,
    columns: u64,
    rising: u64,
    falling: u64,
}

impl Board {
    fn empty(size: i64) -> Self {
        Board {
            size,
            row: 0,
            columns: 0,
            rising: 0,
            falling: 0,
        }
    }

    fn conflicts(&self, column: i64) -> bool {
        let column_bit = 1u64 << column;
        let rising_bit = 1u64 << (self.row + column);
        let falling_bit = 1u64 << (self.row - column + self.size);
        self.columns & column_bit != 0
            || self.rising & rising_bit != 0
            || self.falling & falling_bit != 0
    }

    fn place(mut self, column: i64) -> Self {
        self.columns |= 1 << column;
        self.rising |= 1 << (self.row + column);
        self.falling |= 1 << (self.row - column + self.size);
        self.row += 1;
        self
    }
}

fn count_placements(board: Board) -> Tree<Count> {
    if board.row == board.size {
        return leaf(Count(1));
    }
    between_then(0, board.size - 1, move |column| {
        if board.conflicts(column) {
            null()
        } else {
            count_placements(board.place(column))
        }
    })
}

fn queens_tree(size: i64) -> Tree<Count> {
    count_placements(Board::empty(size))
}

/// Known solution counts for small boards.
const SOLUTIONS: [(i64, u64); 4] = [(4, 2), (5, 10), (6, 4), (7, 40)];

#[test]
fn test_sequential_counts_match_known_values() {
    for (size, expected) in SOLUTIONS {
        let leaves = explore_whole(queens_tree(size)).unwrap();
        let total: u64 = leaves.iter().map(|count| count.0).sum();
        assert_eq!(total, expected, "{size}-queens");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_counts_eight_queens() {
    let settings = ExplorationSettings {
        worker_count: 4,
        steps_between_polls: 8,
        debug_validation: true,
        ..ExplorationSettings::default()
    };
    let outcome = explore(AllMode::<Count>::new(), || queens_tree(8), settings)
        .await
        .unwrap();
    match outcome.reason {
        TerminationReason::Completed(count) => assert_eq!(count, Count(92)),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_first_mode_finds_one_placement() {
    // First-found mode over the same space: some witness turns up long
    // before the space is exhausted.
    let source = || {
        // Rebuild as a value-carrying tree: each solution leaf carries its
        // own marker.
        fn placements(board: Board) -> Tree<u8> {
            if board.row == board.size {
                return leaf(1u8);
            }
            between_then(0, board.size - 1, move |column| {
                if board.conflicts(column) {
                    null()
                } else {
                    placements(board.place(column))
                }
            })
        }
        placements(Board::empty(8))
    };
    let outcome = explore(
        FirstMode::<u8>::new(),
        source,
        ExplorationSettings::with_workers(2),
    )
    .await
    .unwrap();
    match outcome.reason {
        TerminationReason::Completed(witness) => {
            assert_eq!(witness.expect("eight queens has solutions").value, 1);
        }
        other => panic!("expected a witness, got {other:?}"),
    }
}
