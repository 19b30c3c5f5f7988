/// Textbook i-j-k product of two square row-major matrices.
///
/// Each output cell is one dot product of a row of `a` with a column of `b`.
/// The column walk strides by `width`, so this is slow on anything large.
/// It exists as the correctness baseline the distributed paths are checked
/// against, not for speed.
///
/// # Panics
///
/// Panics if either input is not `width * width` long.
pub fn multiply_reference(a: &[f64], b: &[f64], width: usize) -> Vec<f64> {
    assert_eq!(a.len(), width * width, "A: expected {width}x{width}");
    assert_eq!(b.len(), width * width, "B: expected {width}x{width}");

    let mut c = vec![0.0; width * width];
    for i in 0..width {
        for j in 0..width {
            let mut sum = 0.0;
            for p in 0..width {
                sum += a[i * width + p] * b[p * width + j];
            }
            c[i * width + j] = sum;
        }
    }
    c
}

/// Sequential Gaussian elimination without pivoting, in place.
///
/// Same arithmetic as the distributed engine, one row at a time. Returns the
/// index of the first exactly-zero pivot instead of dividing by it.
pub fn eliminate_reference(m: &mut [f64], width: usize) -> Result<(), usize> {
    assert_eq!(m.len(), width * width, "M: expected {width}x{width}");

    for k in 0..width.saturating_sub(1) {
        let pivot = m[k * width + k];
        if pivot == 0.0 {
            return Err(k);
        }
        for row in k + 1..width {
            let factor = m[row * width + k] / pivot;
            m[row * width + k] = 0.0;
            for j in k + 1..width {
                m[row * width + j] -= m[k * width + j] * factor;
            }
        }
    }
    Ok(())
}
