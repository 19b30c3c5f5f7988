//! Local multiply kernel: the rows of `C = A * B` that one worker owns.
//!
//! The worker holds a block of A's rows and a full copy of the right operand,
//! either as B or as B^T. Both layouts do the same arithmetic; they differ in
//! how the right operand is walked:
//!
//! - `RowMajor`: i-k-j order, so the innermost loop streams a row of B and a
//!   row of C with stride 1.
//! - `Transposed`: every output cell is a contiguous dot product of a row of A
//!   with a row of B^T.
//!
//! No communication happens here.

pub(crate) mod rows;

use crate::error::{DistError, expect_len, square_len};
use rows::{for_each_row, worth_splitting};

/// Memory layout of the replicated right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLayout {
    /// `right[i * width + c]` is B[i][c].
    RowMajor,
    /// `right[c * width + i]` is B[i][c], i.e. the buffer holds B^T.
    Transposed,
}

/// Computes `out = left * right` for a block of rows.
///
/// `left` and `out` hold the same number of `width`-long rows; `right` is the
/// full `width × width` operand in `layout`. `out` is overwritten. Rows are
/// spread across rayon's pool once the block's flop count reaches
/// `parallel_threshold`.
pub fn multiply_block(
    left: &[f64],
    right: &[f64],
    out: &mut [f64],
    width: usize,
    layout: OperandLayout,
    parallel_threshold: f64,
) -> Result<(), DistError> {
    if width == 0 {
        return Err(DistError::mismatch("matrix width", 1, 0));
    }
    let n2 = square_len(width)?;
    expect_len("right operand", right, n2)?;
    if left.len() % width != 0 {
        return Err(DistError::mismatch(
            "left block",
            (left.len() / width + 1) * width,
            left.len(),
        ));
    }
    expect_len("product block", out, left.len())?;

    let rows = left.len() / width;
    let flops = 2.0 * rows as f64 * n2 as f64;
    let parallel = worth_splitting(rows, flops, parallel_threshold);

    match layout {
        OperandLayout::RowMajor => for_each_row(out, width, parallel, |r, out_row| {
            out_row.fill(0.0);
            let left_row = &left[r * width..(r + 1) * width];
            for (p, &a) in left_row.iter().enumerate() {
                let right_row = &right[p * width..(p + 1) * width];
                for (c, &b) in out_row.iter_mut().zip(right_row) {
                    *c += a * b;
                }
            }
        }),
        OperandLayout::Transposed => for_each_row(out, width, parallel, |r, out_row| {
            let left_row = &left[r * width..(r + 1) * width];
            for (col, cell) in out_row.iter_mut().enumerate() {
                let right_col = &right[col * width..(col + 1) * width];
                *cell = left_row.iter().zip(right_col).map(|(a, b)| a * b).sum();
            }
        }),
    }
    Ok(())
}
