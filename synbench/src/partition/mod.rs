//! Deterministic cross-call work partitioning.
//!
//! [`distribute`] splits an integer quantity of work near-equally across a
//! fixed group of ranks. The `total / nranks` remainder is handed out to a
//! contiguous window of ranks starting at a persistent cursor, and the
//! cursor advances by `total % nranks` on every call. Partitioning several
//! independent quantities in sequence therefore rotates which ranks receive
//! the extra unit, instead of always favouring the low indices.
//!
//! The cursor lives in a [`Partitioner`] owned by the run context, never in
//! process-global state; a fresh `Partitioner` (or [`Partitioner::reset`])
//! starts a reproducible distribution sequence.

/// One rank's slice of a distributed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    /// Number of work units assigned to this rank.
    pub count: u64,
    /// Global index of this rank's first unit.
    pub first_index: u64,
}

/// Split `total` work units across `nranks` ranks and return `rank`'s share
/// plus the advanced cursor.
///
/// Every rank receives `total / nranks` units; the `total % nranks` leftover
/// units go to the wrapping window of ranks `[carry, carry + rem) mod nranks`.
/// `first_index` is the sum of the shares of all ranks before `rank`.
///
/// For any fixed `carry`, the shares of all ranks sum to exactly `total`.
///
/// # Panics
///
/// Panics when `total == 0`, `nranks == 0`, or `rank >= nranks`: these are
/// caller bugs, not runtime conditions.
pub fn distribute(total: u64, rank: usize, nranks: usize, carry: u64) -> (Share, u64) {
    assert!(total >= 1, "cannot distribute zero work units");
    assert!(nranks >= 1, "rank group must not be empty");
    assert!(rank < nranks, "rank {rank} out of range for {nranks} ranks");

    let n = nranks as u64;
    let rank = rank as u64;
    let base = total / n;
    let rem = total % n;
    let start = carry % n;

    // Offset of `rank` from the window start, in wrap order.
    let offset = (rank + n - start) % n;
    let count = base + u64::from(offset < rem);

    // Window ranks with an index strictly below `rank`.
    let end = start + rem;
    let extras_before = if end <= n {
        // Window [start, end) does not wrap.
        rank.min(end).saturating_sub(start)
    } else {
        // Window wraps: [start, n) plus [0, end - n).
        rank.min(end - n) + rank.saturating_sub(start)
    };
    let first_index = rank * base + extras_before;

    let new_carry = (carry + total) % n;
    (Share { count, first_index }, new_carry)
}

/// Persistent cursor for a sequence of [`distribute`] calls.
///
/// Owned by the run context so that independent runs (and tests) get
/// isolated cursors without a manual process-wide reset step.
#[derive(Debug, Clone, Default)]
pub struct Partitioner {
    carry: u64,
}

impl Partitioner {
    /// A partitioner with the cursor at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `total` across the group and advance the cursor.
    pub fn split(&mut self, total: u64, rank: usize, nranks: usize) -> Share {
        let (share, carry) = distribute(total, rank, nranks, self.carry);
        self.carry = carry;
        share
    }

    /// Zero the cursor, starting a fresh reproducible sequence.
    pub fn reset(&mut self) {
        self.carry = 0;
    }

    /// Current cursor value.
    pub fn carry(&self) -> u64 {
        self.carry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_shares(total: u64, nranks: usize, carry: u64) -> Vec<Share> {
        (0..nranks)
            .map(|rank| distribute(total, rank, nranks, carry).0)
            .collect()
    }

    #[test]
    fn shares_sum_to_total() {
        for total in 1..=50 {
            for nranks in 1..=8 {
                for carry in 0..nranks as u64 {
                    let sum: u64 = all_shares(total, nranks, carry)
                        .iter()
                        .map(|s| s.count)
                        .sum();
                    assert_eq!(sum, total, "total={total} nranks={nranks} carry={carry}");
                }
            }
        }
    }

    #[test]
    fn first_indices_tile_the_range() {
        for total in 1..=40 {
            for nranks in 1..=6 {
                for carry in 0..nranks as u64 {
                    let shares = all_shares(total, nranks, carry);
                    let mut next = 0;
                    for (rank, share) in shares.iter().enumerate() {
                        assert_eq!(
                            share.first_index, next,
                            "total={total} nranks={nranks} carry={carry} rank={rank}"
                        );
                        next += share.count;
                    }
                    assert_eq!(next, total);
                }
            }
        }
    }

    #[test]
    fn remainder_window_rotates_across_calls() {
        // distribute(8, _, 3): base 2, remainder 2, cursor advance 2 per call.
        let expected = [
            [3u64, 3, 2], // carry 0, window {0,1}
            [3, 2, 3],    // carry 2, window {2,0}
            [2, 3, 3],    // carry 1, window {1,2}
            [3, 3, 2],
            [3, 2, 3],
            [2, 3, 3],
        ];
        let mut cursors = [Partitioner::new(), Partitioner::new(), Partitioner::new()];
        for (call, row) in expected.iter().enumerate() {
            for rank in 0..3 {
                let share = cursors[rank].split(8, rank, 3);
                assert_eq!(share.count, row[rank], "call {call} rank {rank}");
            }
        }
    }

    #[test]
    fn reset_reproduces_the_sequence() {
        let mut p = Partitioner::new();
        let first: Vec<u64> = (0..6).map(|_| p.split(8, 1, 3).count).collect();
        p.reset();
        let second: Vec<u64> = (0..6).map(|_| p.split(8, 1, 3).count).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![3, 2, 3, 3, 2, 3]);
    }

    #[test]
    fn single_rank_takes_everything() {
        let (share, carry) = distribute(17, 0, 1, 0);
        assert_eq!(share, Share { count: 17, first_index: 0 });
        assert_eq!(carry, 0);
    }

    #[test]
    fn more_ranks_than_work() {
        // 2 units across 5 ranks, carry 4: window {4, 0} wraps.
        let shares = all_shares(2, 5, 4);
        let counts: Vec<u64> = shares.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 0, 1]);
        assert_eq!(shares[4].first_index, 1);
    }

    #[test]
    #[should_panic(expected = "zero work units")]
    fn zero_total_is_a_bug() {
        let _ = distribute(0, 0, 3, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rank_out_of_range_is_a_bug() {
        let _ = distribute(4, 3, 3, 0);
    }
}
