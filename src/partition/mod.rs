//! Row partitioning of an N×N matrix across P workers.
//!
//! Every worker builds the same [`PartitionPlan`] from `(width, workers, policy)`
//! on its own, so the plan never travels over the wire. Scatter and gather take
//! the plan's element ranges as their per-rank segments.

mod ownership;

pub use ownership::PivotOwnership;

use std::ops::Range;

use crate::error::{DistError, square_len};

/// How rows left over from `width / workers` are handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalancePolicy {
    /// Every remainder row goes to the last worker.
    TailHeavy,
    /// The first `width % workers` workers each take one extra row.
    #[default]
    FrontLoaded,
}

/// One worker's share: a run of whole rows starting at `element_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub row_count: usize,
    pub element_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    width: usize,
    elements: usize,
    policy: BalancePolicy,
    spans: Vec<RowSpan>,
}

impl PartitionPlan {
    /// Splits `width` rows over `workers` ranks.
    ///
    /// Fails with `UnderPartitioned` when some worker would get no row. A zero
    /// width, or one whose `width * width` element count overflows `usize`, is a
    /// `DimensionMismatch` rather than an under-partitioned problem: it is
    /// rejected before the worker count is looked at.
    pub fn new(width: usize, workers: usize, policy: BalancePolicy) -> Result<Self, DistError> {
        if width == 0 {
            return Err(DistError::mismatch("matrix width", 1, 0));
        }
        let elements = square_len(width)?;
        if workers == 0 || width < workers {
            return Err(DistError::UnderPartitioned {
                rows: width,
                workers,
            });
        }

        let base = width / workers;
        let extra = width % workers;

        let mut spans = Vec::with_capacity(workers);
        let mut offset = 0;
        for rank in 0..workers {
            let row_count = match policy {
                BalancePolicy::TailHeavy if rank == workers - 1 => base + extra,
                BalancePolicy::TailHeavy => base,
                BalancePolicy::FrontLoaded if rank < extra => base + 1,
                BalancePolicy::FrontLoaded => base,
            };
            spans.push(RowSpan {
                row_count,
                element_offset: offset,
            });
            offset += row_count * width;
        }
        debug_assert_eq!(offset, elements);

        Ok(Self {
            width,
            elements,
            policy,
            spans,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `width * width`, known not to overflow.
    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn workers(&self) -> usize {
        self.spans.len()
    }

    pub fn policy(&self) -> BalancePolicy {
        self.policy
    }

    pub fn spans(&self) -> &[RowSpan] {
        &self.spans
    }

    pub fn row_count(&self, rank: usize) -> usize {
        self.spans[rank].row_count
    }

    pub fn element_offset(&self, rank: usize) -> usize {
        self.spans[rank].element_offset
    }

    /// Number of elements in `rank`'s row block.
    pub fn block_len(&self, rank: usize) -> usize {
        self.spans[rank].row_count * self.width
    }

    /// Global row indices owned by `rank`.
    pub fn rows(&self, rank: usize) -> Range<usize> {
        let first = self.spans[rank].element_offset / self.width;
        first..first + self.spans[rank].row_count
    }

    /// Position of `rank`'s block inside the full row-major matrix.
    pub fn element_range(&self, rank: usize) -> Range<usize> {
        let start = self.spans[rank].element_offset;
        start..start + self.block_len(rank)
    }

    /// Per-rank segments, in rank order, as scatter and gather expect them.
    pub fn element_ranges(&self) -> Vec<Range<usize>> {
        (0..self.workers()).map(|rank| self.element_range(rank)).collect()
    }
}
