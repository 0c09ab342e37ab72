//! Collective communication between ranks.
//!
//! [`Communicator`] is the seam between the engine and whatever actually
//! links the rank group; the trait's two methods *are* the aggregation
//! protocol's two phases:
//!
//! 1. [`gather_lengths`](Communicator::gather_lengths) — every rank's
//!    serialized length lands in an ordered table on the coordinator;
//! 2. [`gather_bytes`](Communicator::gather_bytes) — the variable-length
//!    payloads land in one contiguous buffer on the coordinator, each at
//!    the prefix-sum offset of the lengths before it.
//!
//! Collectives block the calling rank until the group has arrived (or a
//! rank is declared lost); there is no other synchronization point in the
//! engine.
//!
//! Two implementations: [`SoloComm`] for a single-rank run and
//! [`ThreadComm`] for rank-per-thread groups linked over channels.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::error::CommError;

/// How long the coordinator waits for each rank's contribution before
/// declaring it lost.
pub const GATHER_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking collective operations over a fixed-size, fixed-index rank group.
pub trait Communicator {
    /// This process's rank index within the group.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Phase one: gather every rank's scalar `len` onto the coordinator.
    ///
    /// Returns `Some(table)` on rank 0 with one entry per rank in rank
    /// order, `None` elsewhere.
    fn gather_lengths(&self, len: u64) -> Result<Option<Vec<u64>>, CommError>;

    /// Phase two: gather every rank's variable-length payload onto the
    /// coordinator.
    ///
    /// `lengths` is the coordinator's phase-one table and is ignored on
    /// other ranks. Returns `Some(buffer)` on rank 0, with rank `r`'s
    /// payload occupying `lengths[0..r].sum() .. + lengths[r]`, `None`
    /// elsewhere.
    fn gather_bytes(&self, payload: &[u8], lengths: &[u64]) -> Result<Option<Vec<u8>>, CommError>;
}

/// Degenerate communicator for a single-rank run.
#[derive(Debug, Default)]
pub struct SoloComm;

impl Communicator for SoloComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather_lengths(&self, len: u64) -> Result<Option<Vec<u64>>, CommError> {
        Ok(Some(vec![len]))
    }

    fn gather_bytes(&self, payload: &[u8], _lengths: &[u64]) -> Result<Option<Vec<u8>>, CommError> {
        Ok(Some(payload.to_vec()))
    }
}

/// Channel-backed communicator linking one thread per rank.
///
/// [`ThreadComm::group`] builds the whole group at once; each member moves
/// onto its rank's thread. The coordinator owns one receiver per remote
/// rank, so messages from distinct ranks never interleave and each
/// collective simply reads one message per rank in rank order.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Present on every rank except the coordinator.
    to_root: Option<Sender<Vec<u8>>>,
    /// Present on the coordinator: receiver for rank `r` at index `r - 1`.
    from_ranks: Vec<Receiver<Vec<u8>>>,
}

impl ThreadComm {
    /// Build the communicators for a group of `size` ranks.
    ///
    /// # Panics
    ///
    /// Panics when `size` is zero.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        assert!(size >= 1, "rank group must not be empty");
        let mut senders = Vec::with_capacity(size.saturating_sub(1));
        let mut receivers = Vec::with_capacity(size.saturating_sub(1));
        for _ in 1..size {
            let (tx, rx) = unbounded();
            senders.push(tx);
            receivers.push(rx);
        }
        let mut group = vec![ThreadComm {
            rank: 0,
            size,
            to_root: None,
            from_ranks: receivers,
        }];
        for (index, tx) in senders.into_iter().enumerate() {
            group.push(ThreadComm {
                rank: index + 1,
                size,
                to_root: Some(tx),
                from_ranks: Vec::new(),
            });
        }
        group
    }

    fn send_to_root(&self, message: Vec<u8>) -> Result<(), CommError> {
        let sender = self
            .to_root
            .as_ref()
            .expect("non-coordinator rank is missing its root channel");
        sender.send(message).map_err(|_| CommError::Disconnected)
    }

    fn recv_from(&self, rank: usize) -> Result<Vec<u8>, CommError> {
        match self.from_ranks[rank - 1].recv_timeout(GATHER_TIMEOUT) {
            Ok(message) => Ok(message),
            Err(RecvTimeoutError::Timeout) => Err(CommError::Timeout { rank }),
            Err(RecvTimeoutError::Disconnected) => Err(CommError::Disconnected),
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn gather_lengths(&self, len: u64) -> Result<Option<Vec<u64>>, CommError> {
        if self.rank != 0 {
            self.send_to_root(len.to_le_bytes().to_vec())?;
            return Ok(None);
        }
        let mut table = Vec::with_capacity(self.size);
        table.push(len);
        for rank in 1..self.size {
            let message = self.recv_from(rank)?;
            let bytes: [u8; 8] = message
                .as_slice()
                .try_into()
                .map_err(|_| CommError::BadLength { rank })?;
            table.push(u64::from_le_bytes(bytes));
        }
        Ok(Some(table))
    }

    fn gather_bytes(&self, payload: &[u8], lengths: &[u64]) -> Result<Option<Vec<u8>>, CommError> {
        if self.rank != 0 {
            self.send_to_root(payload.to_vec())?;
            return Ok(None);
        }
        debug_assert_eq!(lengths.len(), self.size, "phase-one table size mismatch");
        let total: u64 = lengths.iter().sum();
        let mut buffer = Vec::with_capacity(total as usize);
        buffer.extend_from_slice(payload);
        for rank in 1..self.size {
            let message = self.recv_from(rank)?;
            if message.len() as u64 != lengths[rank] {
                return Err(CommError::LengthMismatch {
                    rank,
                    announced: lengths[rank],
                    actual: message.len() as u64,
                });
            }
            buffer.extend_from_slice(&message);
        }
        Ok(Some(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn solo_comm_gathers_itself() {
        let comm = SoloComm;
        let lengths = comm.gather_lengths(3).unwrap().unwrap();
        assert_eq!(lengths, vec![3]);
        let buffer = comm.gather_bytes(b"abc", &lengths).unwrap().unwrap();
        assert_eq!(buffer, b"abc");
    }

    #[test]
    fn two_phase_gather_across_threads() {
        let group = ThreadComm::group(3);
        let mut handles = Vec::new();
        let mut iter = group.into_iter();
        let root = iter.next().unwrap();
        for comm in iter {
            handles.push(thread::spawn(move || {
                let payload = vec![b'a' + comm.rank() as u8; comm.rank() + 1];
                assert!(comm.gather_lengths(payload.len() as u64).unwrap().is_none());
                assert!(comm.gather_bytes(&payload, &[]).unwrap().is_none());
            }));
        }

        let lengths = root.gather_lengths(1).unwrap().unwrap();
        assert_eq!(lengths, vec![1, 2, 3]);
        let buffer = root.gather_bytes(b"a", &lengths).unwrap().unwrap();
        assert_eq!(buffer, b"abbccc");

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn dropped_rank_is_reported_not_hung() {
        let mut group = ThreadComm::group(2);
        let root = group.remove(0);
        drop(group); // rank 1 never participates
        let err = root.gather_lengths(0).unwrap_err();
        assert!(matches!(err, CommError::Disconnected));
    }
}
