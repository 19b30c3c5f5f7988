//! Error types shared by every distributed operation.

use std::fmt;

/// The class of a failure, independent of which worker saw it.
///
/// Workers exchange only this tag when agreeing on a failure, so a peer's error
/// can be reported with the same kind on every rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnderPartitioned,
    DimensionMismatch,
    AllocationFailure,
    CollectiveFailure,
    SingularPivot,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnderPartitioned => "under-partitioned",
            ErrorKind::DimensionMismatch => "dimension mismatch",
            ErrorKind::AllocationFailure => "allocation failure",
            ErrorKind::CollectiveFailure => "collective failure",
            ErrorKind::SingularPivot => "singular pivot",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DistError {
    #[error("poorly balanced problem: {rows} rows, {workers} workers")]
    UnderPartitioned { rows: usize, workers: usize },

    #[error("{what}: expected {expected} elements, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("could not allocate a buffer of {elements} elements")]
    AllocationFailure { elements: usize },

    #[error("collective failed: {0}")]
    Collective(String),

    #[error("zero pivot at row {row}")]
    SingularPivot { row: usize },

    #[error("rank {rank} failed: {kind}")]
    PeerFailed { rank: usize, kind: ErrorKind },
}

impl DistError {
    /// The failure class; for [`DistError::PeerFailed`] this is the peer's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DistError::UnderPartitioned { .. } => ErrorKind::UnderPartitioned,
            DistError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            DistError::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            DistError::Collective(_) => ErrorKind::CollectiveFailure,
            DistError::SingularPivot { .. } => ErrorKind::SingularPivot,
            DistError::PeerFailed { kind, .. } => *kind,
        }
    }

    pub(crate) fn mismatch(what: &'static str, expected: usize, found: usize) -> Self {
        DistError::DimensionMismatch {
            what,
            expected,
            found,
        }
    }
}

/// Checks a buffer length, naming the buffer in the error.
pub(crate) fn expect_len(what: &'static str, buf: &[f64], expected: usize) -> Result<(), DistError> {
    if buf.len() == expected {
        Ok(())
    } else {
        Err(DistError::mismatch(what, expected, buf.len()))
    }
}

/// Element count of a `width × width` matrix, or `DimensionMismatch` when it
/// does not fit in `usize`.
pub(crate) fn square_len(width: usize) -> Result<usize, DistError> {
    width
        .checked_mul(width)
        .ok_or_else(|| DistError::mismatch("matrix width", usize::MAX.isqrt(), width))
}

/// Allocates a zeroed buffer, reporting allocator refusal instead of aborting.
pub(crate) fn alloc_zeroed(elements: usize) -> Result<Vec<f64>, DistError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(elements)
        .map_err(|_| DistError::AllocationFailure { elements })?;
    buf.resize(elements, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_failure_reports_peer_kind() {
        let err = DistError::PeerFailed {
            rank: 2,
            kind: ErrorKind::SingularPivot,
        };
        assert_eq!(err.kind(), ErrorKind::SingularPivot);
        assert_eq!(err.to_string(), "rank 2 failed: singular pivot");
    }

    #[test]
    fn under_partitioned_message() {
        let err = DistError::UnderPartitioned { rows: 2, workers: 3 };
        assert_eq!(err.to_string(), "poorly balanced problem: 2 rows, 3 workers");
        assert_eq!(err.kind(), ErrorKind::UnderPartitioned);
    }

    #[test]
    fn alloc_zeroed_fills_with_zero() {
        let buf = alloc_zeroed(7).unwrap();
        assert_eq!(buf, vec![0.0; 7]);
    }

    #[test]
    fn impossible_allocation_is_reported() {
        let err = alloc_zeroed(usize::MAX / 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AllocationFailure);
    }

    #[test]
    fn expect_len_names_the_buffer() {
        let err = expect_len("right operand", &[1.0, 2.0], 4).unwrap_err();
        assert_eq!(err.to_string(), "right operand: expected 4 elements, found 2");
    }
}
