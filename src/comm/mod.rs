//! Collective communication over a fixed group of workers.
//!
//! Workers share no memory; all data moves through the collectives below. Each
//! collective is a group-wide synchronization point: every rank must issue the
//! same collectives in the same order, or the group deadlocks.
//!
//! [`LocalGroup`] runs a group inside one process, one thread per rank, with
//! message passing over channels.

mod local;

pub use local::{LocalComm, LocalGroup};

use std::ops::Range;

use crate::error::DistError;

/// Group membership plus the collectives the orchestration layer needs.
///
/// Buffers not meaningful on a rank (the send side of a broadcast on non-root
/// ranks, the full matrix on non-root ranks) are passed as empty slices.
pub trait Collective {
    /// This worker's rank, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Root sends `send` to every rank; other ranks fill `recv`, which must
    /// match the root's length. `recv` is untouched on root.
    fn broadcast(&self, send: &[f64], recv: &mut [f64], root: usize) -> Result<(), DistError>;

    /// Root splits `send` along `segments` (one element range per rank, in rank
    /// order); every rank, root included, receives its segment into `recv`.
    fn scatter_varying(
        &self,
        send: &[f64],
        segments: &[Range<usize>],
        recv: &mut [f64],
        root: usize,
    ) -> Result<(), DistError>;

    /// Inverse of [`scatter_varying`](Collective::scatter_varying): each rank's
    /// `send` lands in root's `recv[segments[rank]]`.
    fn gather_varying(
        &self,
        send: &[f64],
        recv: &mut [f64],
        segments: &[Range<usize>],
        root: usize,
    ) -> Result<(), DistError>;

    /// Shares every rank's local failure, if any, with the whole group.
    ///
    /// Returns [`DistError::PeerFailed`] naming the lowest failing rank when that
    /// rank is not this one. A rank passing its own error gets `Ok` back unless a
    /// lower rank failed too; it reports its own error itself. After this call
    /// every rank knows whether the group continues.
    fn agree(&self, local: Option<&DistError>) -> Result<(), DistError>;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

pub(crate) fn check_segments(
    segments: &[Range<usize>],
    size: usize,
    total: usize,
) -> Result<(), DistError> {
    if segments.len() != size {
        return Err(DistError::mismatch("segment table", size, segments.len()));
    }
    if let Some(past_end) = segments.iter().find(|s| s.end > total || s.start > s.end) {
        return Err(DistError::mismatch("segment end", total, past_end.end));
    }
    Ok(())
}
