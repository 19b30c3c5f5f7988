//! Distributed `C = A * B` for square matrices.
//!
//! Every variant runs the same skeleton:
//!
//! 1. plan the row partition,
//! 2. get the right operand onto every worker (the only step that differs),
//! 3. scatter A's rows by the plan,
//! 4. multiply each block locally,
//! 5. gather the product blocks back into C on rank 0.

mod variant;

pub use variant::{ParseVariantError, Variant};

use tracing::{debug, warn};

use crate::comm::Collective;
use crate::config::{ExecConfig, TransposeSite};
use crate::error::{DistError, alloc_zeroed, expect_len};
use crate::kernel::{OperandLayout, multiply_block};
use crate::matrix::transpose::transpose;
use crate::partition::PartitionPlan;

/// [`multiply_with`] using [`ExecConfig::default`].
pub fn multiply<C: Collective>(
    comm: &C,
    a: &[f64],
    b: &[f64],
    c: &mut [f64],
    width: usize,
    variant: Variant,
) -> Result<(), DistError> {
    multiply_with(comm, a, b, c, width, variant, &ExecConfig::default())
}

/// Multiplies two `width × width` matrices across the group.
///
/// `a`, `b` and `c` are only read on rank 0; other ranks pass empty slices and
/// get `Ok(())` with nothing to show for it. For [`Variant::Pretranspose`], `b`
/// must already hold B^T. Every rank must call this with the same `width`,
/// `variant` and `config`.
///
/// Any failure, wherever it starts, is returned on every rank.
pub fn multiply_with<C: Collective>(
    comm: &C,
    a: &[f64],
    b: &[f64],
    c: &mut [f64],
    width: usize,
    variant: Variant,
    config: &ExecConfig,
) -> Result<(), DistError> {
    let result = run(comm, a, b, c, width, variant, config);
    if let Err(err) = &result {
        warn!(rank = comm.rank(), %variant, error = %err, "multiply failed");
    }
    result
}

/// Buffers one worker holds for the duration of a multiply.
struct Workspace {
    /// Replica of the right operand. On root, only allocated when root
    /// transposes B; otherwise root reads `b` in place.
    right: Vec<f64>,
    /// Worker-side transpose of the right operand.
    transposed: Vec<f64>,
    block: Vec<f64>,
    product: Vec<f64>,
}

impl Workspace {
    fn acquire(
        plan: &PartitionPlan,
        rank: usize,
        variant: Variant,
        site: TransposeSite,
    ) -> Result<Self, DistError> {
        let n2 = plan.elements();
        let root_transposes = variant.transposes() && site == TransposeSite::Root;
        let worker_transposes = variant.transposes() && site == TransposeSite::Worker;

        let right = if rank != 0 || root_transposes {
            alloc_zeroed(n2)?
        } else {
            Vec::new()
        };
        let transposed = if worker_transposes {
            alloc_zeroed(n2)?
        } else {
            Vec::new()
        };

        Ok(Self {
            right,
            transposed,
            block: alloc_zeroed(plan.block_len(rank))?,
            product: alloc_zeroed(plan.block_len(rank))?,
        })
    }
}

fn run<C: Collective>(
    comm: &C,
    a: &[f64],
    b: &[f64],
    c: &mut [f64],
    width: usize,
    variant: Variant,
    config: &ExecConfig,
) -> Result<(), DistError> {
    let rank = comm.rank();
    let plan = PartitionPlan::new(width, comm.size(), variant.policy())?;

    if comm.size() == 1 {
        debug!(width, %variant, "single worker, multiplying locally");
        return multiply_local(a, b, c, &plan, variant, config);
    }

    let prepared = check_root_operands(comm.is_root(), a, b, c, plan.elements())
        .and_then(|()| Workspace::acquire(&plan, rank, variant, config.transpose_site));
    let agreed = comm.agree(prepared.as_ref().err());
    let mut ws = prepared?;
    agreed?;

    let site = config.transpose_site;
    let root_transposes = variant.transposes() && site == TransposeSite::Root;
    let transpose_cutoff = config.transpose_threshold;

    if comm.is_root() {
        let send: &[f64] = if root_transposes {
            transpose(b, &mut ws.right, width, transpose_cutoff);
            &ws.right
        } else {
            b
        };
        comm.broadcast(send, &mut [], 0)?;
    } else {
        comm.broadcast(&[], &mut ws.right, 0)?;
    }
    debug!(rank, %variant, "right operand replicated");

    if variant.transposes() && site == TransposeSite::Worker {
        let received: &[f64] = if comm.is_root() { b } else { &ws.right };
        transpose(received, &mut ws.transposed, width, transpose_cutoff);
    }

    let segments = plan.element_ranges();
    comm.scatter_varying(a, &segments, &mut ws.block, 0)?;
    debug!(rank, rows = plan.row_count(rank), first_row = plan.rows(rank).start, "block received");

    let operand: &[f64] = if variant.transposes() && site == TransposeSite::Worker {
        &ws.transposed
    } else if comm.is_root() && !root_transposes {
        b
    } else {
        &ws.right
    };
    multiply_block(
        &ws.block,
        operand,
        &mut ws.product,
        width,
        variant.layout(),
        config.parallel_threshold,
    )?;

    comm.gather_varying(&ws.product, c, &segments, 0)?;
    debug!(rank, "product block gathered");
    Ok(())
}

fn check_root_operands(
    is_root: bool,
    a: &[f64],
    b: &[f64],
    c: &[f64],
    n2: usize,
) -> Result<(), DistError> {
    if !is_root {
        return Ok(());
    }
    expect_len("left operand", a, n2)?;
    expect_len("right operand", b, n2)?;
    expect_len("product", c, n2)
}

/// One worker: the kernel over the whole matrix, no communication.
fn multiply_local(
    a: &[f64],
    b: &[f64],
    c: &mut [f64],
    plan: &PartitionPlan,
    variant: Variant,
    config: &ExecConfig,
) -> Result<(), DistError> {
    let width = plan.width();
    check_root_operands(true, a, b, c, plan.elements())?;
    if variant.transposes() {
        let mut bt = alloc_zeroed(plan.elements())?;
        transpose(b, &mut bt, width, config.transpose_threshold);
        multiply_block(a, &bt, c, width, OperandLayout::Transposed, config.parallel_threshold)
    } else {
        multiply_block(a, b, c, width, variant.layout(), config.parallel_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalGroup;
    use crate::error::ErrorKind;
    use crate::matrix::reference::multiply_reference;

    fn operands(width: usize) -> (Vec<f64>, Vec<f64>) {
        let a = (0..width * width).map(|i| (i % 11) as f64 - 5.0).collect();
        let b = (0..width * width).map(|i| (i % 7) as f64 * 0.5).collect();
        (a, b)
    }

    fn run_group(
        workers: usize,
        width: usize,
        variant: Variant,
        config: &ExecConfig,
        a: &[f64],
        b: &[f64],
    ) -> Vec<Result<Vec<f64>, DistError>> {
        LocalGroup::run(workers, |comm| {
            let mut c = if comm.is_root() { vec![0.0; width * width] } else { Vec::new() };
            let (a, b) = if comm.is_root() { (a, b) } else { (&[][..], &[][..]) };
            multiply_with(comm, a, b, &mut c, width, variant, config).map(|()| c)
        })
    }

    #[test]
    fn worker_side_transpose_matches_root_side() {
        let width = 9;
        let (a, b) = operands(width);
        let expected = multiply_reference(&a, &b, width);
        let config = ExecConfig {
            transpose_site: TransposeSite::Worker,
            ..ExecConfig::default()
        };

        let results = run_group(4, width, Variant::Transpose, &config, &a, &b);
        let c = results[0].as_ref().unwrap();
        for (x, y) in c.iter().zip(&expected) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn parallel_kernel_inside_workers() {
        let width = 16;
        let (a, b) = operands(width);
        let expected = multiply_reference(&a, &b, width);
        let config = ExecConfig::default().always_parallel();

        let results = run_group(3, width, Variant::Balanced, &config, &a, &b);
        let c = results[0].as_ref().unwrap();
        for (x, y) in c.iter().zip(&expected) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn parallel_transpose_on_either_site() {
        let width = 12;
        let (a, b) = operands(width);
        let expected = multiply_reference(&a, &b, width);

        for site in [TransposeSite::Root, TransposeSite::Worker] {
            let config = ExecConfig {
                transpose_site: site,
                ..ExecConfig::default().always_parallel()
            };
            for workers in [1, 3] {
                let results = run_group(workers, width, Variant::Transpose, &config, &a, &b);
                let c = results[0].as_ref().unwrap();
                for (x, y) in c.iter().zip(&expected) {
                    assert!((x - y).abs() < 1e-9, "{site:?} on {workers}");
                }
            }
        }
    }

    #[test]
    fn overflowing_width_fails_without_panicking() {
        let width = usize::MAX.isqrt() + 1;
        for workers in [1, 2] {
            let results = LocalGroup::run(workers, |comm| {
                multiply(comm, &[], &[], &mut [], width, Variant::Baseline)
            });
            for result in results {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::DimensionMismatch);
            }
        }
    }

    #[test]
    fn short_root_buffer_fails_everywhere() {
        let width = 4;
        let (a, b) = operands(width);
        let results = run_group(2, width, Variant::Baseline, &ExecConfig::default(), &a, &b[..15]);
        for result in results {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::DimensionMismatch);
        }
    }

    #[test]
    fn too_many_workers_fails_everywhere() {
        let (a, b) = operands(2);
        let results = run_group(3, 2, Variant::Balanced, &ExecConfig::default(), &a, &b);
        for result in results {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::UnderPartitioned);
        }
    }

    #[test]
    fn single_worker_transposes_locally() {
        let width = 5;
        let (a, b) = operands(width);
        let expected = multiply_reference(&a, &b, width);
        let results = run_group(1, width, Variant::Transpose, &ExecConfig::default(), &a, &b);
        assert_eq!(results[0].as_ref().unwrap(), &expected);
    }
}
