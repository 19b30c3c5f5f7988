//! In-process worker group backed by channels.
//!
//! Every ordered pair of ranks gets its own channel, so messages from one
//! source arrive in the order they were sent and a receiver can wait on a
//! specific source. Nothing is shared between ranks except those channels.

use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::trace;

use super::{Collective, check_segments};
use crate::error::{DistError, ErrorKind, expect_len};

enum Frame {
    Data(Vec<f64>),
    /// Lowest failing rank and its error kind, if any.
    Status(Option<(usize, ErrorKind)>),
}

/// One rank's endpoint into a [`LocalGroup`].
///
/// Dropping it closes its channels; peers blocked on this rank then fail with
/// `CollectiveFailure` instead of waiting forever.
pub struct LocalComm {
    rank: usize,
    size: usize,
    /// `outbox[dest]`
    outbox: Vec<Sender<Frame>>,
    /// `inbox[src]`
    inbox: Vec<Receiver<Frame>>,
}

/// Builder for a group of [`LocalComm`]s.
pub struct LocalGroup;

impl LocalGroup {
    /// Creates `size` connected endpoints, index `r` being rank `r`.
    pub fn new(size: usize) -> Vec<LocalComm> {
        let mut outboxes: Vec<Vec<Sender<Frame>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Frame>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();

        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = mpsc::channel();
                outboxes[src].push(tx);
                inboxes[dst].push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalComm {
                rank,
                size,
                outbox,
                inbox,
            })
            .collect()
    }

    /// Runs `work` on `size` threads, one per rank, and returns the results in
    /// rank order.
    ///
    /// Each thread's endpoint is dropped as soon as its `work` returns.
    ///
    /// # Panics
    ///
    /// Propagates a panic from any worker thread.
    pub fn run<T, F>(size: usize, work: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&LocalComm) -> T + Sync,
    {
        let comms = Self::new(size);
        let work = &work;
        thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| scope.spawn(move || work(&comm)))
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

impl LocalComm {
    fn send(&self, dest: usize, frame: Frame) -> Result<(), DistError> {
        self.outbox[dest]
            .send(frame)
            .map_err(|_| DistError::Collective(format!("rank {dest} has left the group")))
    }

    fn recv(&self, src: usize) -> Result<Frame, DistError> {
        self.inbox[src]
            .recv()
            .map_err(|_| DistError::Collective(format!("rank {src} has left the group")))
    }

    fn recv_data(&self, src: usize, into: &mut [f64], what: &'static str) -> Result<(), DistError> {
        match self.recv(src)? {
            Frame::Data(data) => {
                expect_len(what, &data, into.len())?;
                into.copy_from_slice(&data);
                Ok(())
            }
            Frame::Status(_) => Err(DistError::Collective(format!(
                "rank {src} sent a status frame where {what} was expected"
            ))),
        }
    }

    fn recv_status(&self, src: usize) -> Result<Option<(usize, ErrorKind)>, DistError> {
        match self.recv(src)? {
            Frame::Status(status) => Ok(status),
            Frame::Data(_) => Err(DistError::Collective(format!(
                "rank {src} sent data where a status was expected"
            ))),
        }
    }

    fn check_root(&self, root: usize) -> Result<(), DistError> {
        if root < self.size {
            Ok(())
        } else {
            Err(DistError::Collective(format!(
                "root {root} outside a group of {}",
                self.size
            )))
        }
    }
}

impl Collective for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, send: &[f64], recv: &mut [f64], root: usize) -> Result<(), DistError> {
        self.check_root(root)?;
        if self.rank == root {
            trace!(rank = self.rank, len = send.len(), "broadcast send");
            for dest in (0..self.size).filter(|&d| d != root) {
                self.send(dest, Frame::Data(send.to_vec()))?;
            }
            Ok(())
        } else {
            self.recv_data(root, recv, "broadcast buffer")
        }
    }

    fn scatter_varying(
        &self,
        send: &[f64],
        segments: &[Range<usize>],
        recv: &mut [f64],
        root: usize,
    ) -> Result<(), DistError> {
        self.check_root(root)?;
        if self.rank != root {
            return self.recv_data(root, recv, "scattered block");
        }

        check_segments(segments, self.size, send.len())?;
        for (dest, segment) in segments.iter().enumerate() {
            let part = &send[segment.clone()];
            if dest == root {
                expect_len("scattered block", recv, part.len())?;
                recv.copy_from_slice(part);
            } else {
                self.send(dest, Frame::Data(part.to_vec()))?;
            }
        }
        Ok(())
    }

    fn gather_varying(
        &self,
        send: &[f64],
        recv: &mut [f64],
        segments: &[Range<usize>],
        root: usize,
    ) -> Result<(), DistError> {
        self.check_root(root)?;
        if self.rank != root {
            return self.send(root, Frame::Data(send.to_vec()));
        }

        check_segments(segments, self.size, recv.len())?;
        for (src, segment) in segments.iter().enumerate() {
            let slot = &mut recv[segment.clone()];
            if src == root {
                expect_len("gathered block", send, slot.len())?;
                slot.copy_from_slice(send);
            } else {
                self.recv_data(src, slot, "gathered block")?;
            }
        }
        Ok(())
    }

    fn agree(&self, local: Option<&DistError>) -> Result<(), DistError> {
        let mine = local.map(|e| (self.rank, e.kind()));

        let verdict = if self.rank == 0 {
            let mut verdict = mine;
            for src in 1..self.size {
                let theirs = self.recv_status(src)?;
                verdict = verdict.or(theirs);
            }
            for dest in 1..self.size {
                self.send(dest, Frame::Status(verdict))?;
            }
            verdict
        } else {
            self.send(0, Frame::Status(mine))?;
            self.recv_status(0)?
        };

        match verdict {
            Some((rank, kind)) if rank != self.rank => Err(DistError::PeerFailed { rank, kind }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_know_their_rank() {
        let comms = LocalGroup::new(3);
        let ranks: Vec<_> = comms.iter().map(|c| (c.rank(), c.size())).collect();
        assert_eq!(ranks, vec![(0, 3), (1, 3), (2, 3)]);
        assert!(comms[0].is_root());
        assert!(!comms[2].is_root());
    }

    #[test]
    fn broadcast_reaches_every_rank() {
        let results = LocalGroup::run(4, |comm| {
            let send = if comm.rank() == 2 { vec![1.0, 2.0, 3.0] } else { Vec::new() };
            let mut recv = vec![0.0; 3];
            comm.broadcast(&send, &mut recv, 2).unwrap();
            recv
        });
        for (rank, recv) in results.iter().enumerate() {
            if rank == 2 {
                assert_eq!(recv, &vec![0.0; 3], "root's recv is untouched");
            } else {
                assert_eq!(recv, &vec![1.0, 2.0, 3.0]);
            }
        }
    }

    #[test]
    fn uneven_scatter_then_gather_round_trips() {
        let segments = vec![0..1, 1..4, 4..6];
        let results = LocalGroup::run(3, |comm| {
            let full: Vec<f64> = if comm.is_root() {
                (0..6).map(f64::from).collect()
            } else {
                Vec::new()
            };
            let mut block = vec![0.0; segments[comm.rank()].len()];
            comm.scatter_varying(&full, &segments, &mut block, 0).unwrap();
            let received = block.clone();

            for v in block.iter_mut() {
                *v *= 10.0;
            }
            let mut back = if comm.is_root() { vec![0.0; 6] } else { Vec::new() };
            comm.gather_varying(&block, &mut back, &segments, 0).unwrap();
            (received, back)
        });

        assert_eq!(results[0].0, vec![0.0]);
        assert_eq!(results[1].0, vec![1.0, 2.0, 3.0]);
        assert_eq!(results[2].0, vec![4.0, 5.0]);
        assert_eq!(results[0].1, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn agree_spreads_a_single_failure() {
        let results = LocalGroup::run(4, |comm| {
            let failure = DistError::AllocationFailure { elements: 9 };
            let local = (comm.rank() == 2).then_some(&failure);
            comm.agree(local)
        });

        for (rank, result) in results.into_iter().enumerate() {
            if rank == 2 {
                assert!(result.is_ok(), "the failing rank reports its own error");
            } else {
                let err = result.unwrap_err();
                assert_eq!(err.kind(), ErrorKind::AllocationFailure);
                assert!(matches!(err, DistError::PeerFailed { rank: 2, .. }));
            }
        }
    }

    #[test]
    fn agree_names_the_lowest_failing_rank() {
        let results = LocalGroup::run(3, |comm| {
            let local = match comm.rank() {
                1 => Some(DistError::SingularPivot { row: 0 }),
                2 => Some(DistError::Collective("boom".into())),
                _ => None,
            };
            comm.agree(local.as_ref())
        });
        for rank in [0, 2] {
            assert!(matches!(
                results[rank],
                Err(DistError::PeerFailed {
                    rank: 1,
                    kind: ErrorKind::SingularPivot
                })
            ));
        }
        assert!(results[1].is_ok());
    }

    #[test]
    fn agree_passes_when_all_succeed() {
        let results = LocalGroup::run(3, |comm| comm.agree(None));
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn departed_peer_fails_instead_of_hanging() {
        let mut comms = LocalGroup::new(2);
        let worker = comms.pop().unwrap();
        drop(comms);

        let mut recv = vec![0.0; 2];
        let err = worker.broadcast(&[], &mut recv, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollectiveFailure);
    }

    #[test]
    fn wrong_receive_length_is_a_dimension_error() {
        let results = LocalGroup::run(2, |comm| {
            let mut recv = vec![0.0; if comm.is_root() { 0 } else { 2 }];
            comm.broadcast(&[1.0, 2.0, 3.0], &mut recv, 0)
        });
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn bad_root_is_rejected() {
        let comms = LocalGroup::new(1);
        let err = comms[0].broadcast(&[], &mut [], 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollectiveFailure);
    }
}
