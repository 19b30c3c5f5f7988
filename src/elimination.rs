//! Distributed in-place Gaussian elimination without pivoting.
//!
//! Rows are scattered by a [`PartitionPlan`]. For each pivot index `k` the rank
//! holding row `k` broadcasts it straight out of its block, and every rank
//! eliminates column `k` from its rows below `k`. Ownership of the pivot row
//! moves from rank to rank as `k` advances, never backwards.
//!
//! Whether the pivot is zero is decided from the broadcast row itself, which
//! every rank holds identically, so all ranks stop at the same step and none is
//! left waiting on a broadcast that will not come.

use tracing::{debug, trace, warn};

use crate::comm::Collective;
use crate::config::ExecConfig;
use crate::error::{DistError, alloc_zeroed, expect_len};
use crate::kernel::rows::{for_each_row, worth_splitting};
use crate::partition::{PartitionPlan, PivotOwnership};

/// [`eliminate_with`] using [`ExecConfig::default`].
pub fn eliminate<C: Collective>(comm: &C, m: &mut [f64], width: usize) -> Result<(), DistError> {
    eliminate_with(comm, m, width, &ExecConfig::default())
}

/// Reduces the `width × width` matrix `m` on rank 0 to row-echelon form.
///
/// Non-root ranks pass an empty slice. Fails with `SingularPivot` on every rank
/// as soon as a pivot is exactly zero; `m` is then left as it was.
pub fn eliminate_with<C: Collective>(
    comm: &C,
    m: &mut [f64],
    width: usize,
    config: &ExecConfig,
) -> Result<(), DistError> {
    let result = run(comm, m, width, config);
    if let Err(err) = &result {
        warn!(rank = comm.rank(), error = %err, "elimination failed");
    }
    result
}

fn run<C: Collective>(
    comm: &C,
    m: &mut [f64],
    width: usize,
    config: &ExecConfig,
) -> Result<(), DistError> {
    let rank = comm.rank();
    let plan = PartitionPlan::new(width, comm.size(), config.elimination_policy)?;

    if comm.size() == 1 {
        expect_len("matrix", m, plan.elements())?;
        debug!(width, "single worker, eliminating locally");
        return eliminate_local(m, width, config.parallel_threshold);
    }

    let prepared = prepare(comm.is_root(), m, &plan, rank);
    let agreed = comm.agree(prepared.as_ref().err());
    let (mut block, mut pivot_buf) = prepared?;
    agreed?;

    let segments = plan.element_ranges();
    comm.scatter_varying(m, &segments, &mut block, 0)?;

    let rows = plan.rows(rank);
    debug!(rank, first_row = rows.start, rows = rows.len(), "block received");

    let mut owners = PivotOwnership::new(&plan);
    for k in 0..width - 1 {
        let owner = owners.owner_of(k);
        trace!(rank, k, owner, "pivot step");

        if owner == rank {
            let local = k - rows.start;
            let (head, below) = block.split_at_mut((local + 1) * width);
            let pivot = &head[local * width..];
            comm.broadcast(pivot, &mut [], owner)?;
            check_pivot(pivot, k)?;
            eliminate_below(pivot, below, k, width, config.parallel_threshold);
        } else {
            comm.broadcast(&[], &mut pivot_buf, owner)?;
            check_pivot(&pivot_buf, k)?;
            let first_below = (k + 1).saturating_sub(rows.start).min(rows.len());
            eliminate_below(
                &pivot_buf,
                &mut block[first_below * width..],
                k,
                width,
                config.parallel_threshold,
            );
        }
    }

    comm.gather_varying(&block, m, &segments, 0)?;
    debug!(rank, "reduced block gathered");
    Ok(())
}

/// Root checks the matrix; every rank allocates its row block and pivot buffer.
fn prepare(
    is_root: bool,
    m: &[f64],
    plan: &PartitionPlan,
    rank: usize,
) -> Result<(Vec<f64>, Vec<f64>), DistError> {
    if is_root {
        expect_len("matrix", m, plan.elements())?;
    }
    Ok((alloc_zeroed(plan.block_len(rank))?, alloc_zeroed(plan.width())?))
}

fn check_pivot(pivot_row: &[f64], k: usize) -> Result<(), DistError> {
    if pivot_row[k] == 0.0 {
        Err(DistError::SingularPivot { row: k })
    } else {
        Ok(())
    }
}

/// Eliminates column `k` from every row in `rows` using `pivot_row`.
///
/// The eliminated entry is set to exactly zero rather than computed.
fn eliminate_below(pivot_row: &[f64], rows: &mut [f64], k: usize, width: usize, threshold: f64) {
    let count = rows.len() / width;
    let flops = 2.0 * count as f64 * (width - k) as f64;
    let pivot = pivot_row[k];

    for_each_row(rows, width, worth_splitting(count, flops, threshold), |_, row| {
        let factor = row[k] / pivot;
        row[k] = 0.0;
        for (cell, &p) in row[k + 1..].iter_mut().zip(&pivot_row[k + 1..]) {
            *cell -= p * factor;
        }
    });
}

/// Single-worker elimination directly in `m`.
fn eliminate_local(m: &mut [f64], width: usize, threshold: f64) -> Result<(), DistError> {
    for k in 0..width - 1 {
        let (head, below) = m.split_at_mut((k + 1) * width);
        let pivot = &head[k * width..];
        check_pivot(pivot, k)?;
        eliminate_below(pivot, below, k, width, threshold);
    }
    Ok(())
}
