use rayon::prelude::*;

/// Transpose a square matrix: dst = src^T
///
/// Each row of `dst` is filled from one column of `src`. Rows of `dst` are
/// independent, so above `parallel_threshold` elements they are written from
/// rayon's pool.
///
/// # Example
///
/// ```
/// use distmat::matrix::transpose::transpose;
///
/// let src = vec![1.0, 2.0, 3.0,
///                4.0, 5.0, 6.0,
///                7.0, 8.0, 9.0];
/// let mut dst = vec![0.0; 9];
///
/// transpose(&src, &mut dst, 3, usize::MAX);
///
/// assert_eq!(dst, vec![1.0, 4.0, 7.0,
///                      2.0, 5.0, 8.0,
///                      3.0, 6.0, 9.0]);
/// ```
///
/// # Panics
///
/// Panics if either slice is not `width * width` long.
pub fn transpose(src: &[f64], dst: &mut [f64], width: usize, parallel_threshold: usize) {
    assert_eq!(src.len(), width * width, "src: expected {width}x{width}");
    assert_eq!(dst.len(), width * width, "dst: expected {width}x{width}");
    if width == 0 {
        return;
    }

    let fill = |(j, row): (usize, &mut [f64])| {
        for (i, cell) in row.iter_mut().enumerate() {
            *cell = src[i * width + j];
        }
    };

    if src.len() >= parallel_threshold {
        dst.par_chunks_mut(width).enumerate().for_each(fill);
    } else {
        dst.chunks_mut(width).enumerate().for_each(fill);
    }
}
