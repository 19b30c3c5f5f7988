//! Dense square matrices stored as flat row-major `f64` slices.
//!
//! Reference implementations, transposition, the text file format and a few
//! helpers used to validate distributed results.

pub mod io;
pub mod reference;
pub mod transpose;

/// `width × width` identity matrix.
pub fn identity(width: usize) -> Vec<f64> {
    let mut m = vec![0.0; width * width];
    for i in 0..width {
        m[i * width + i] = 1.0;
    }
    m
}

/// Relative difference of `of` from `against`.
///
/// Falls back to the absolute difference when `against` is zero, so exact
/// zeros compare equal and near-zeros stay small.
pub fn relative_error(of: f64, against: f64) -> f64 {
    let diff = (of - against).abs();
    if against == 0.0 { diff } else { diff / against.abs() }
}

/// Largest [`relative_error`] over two equally sized matrices, with its index.
pub fn max_relative_error(actual: &[f64], expected: &[f64]) -> (usize, f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    actual
        .iter()
        .zip(expected)
        .map(|(&a, &e)| relative_error(a, e))
        .enumerate()
        .fold((0, 0.0), |best, (i, err)| if err > best.1 { (i, err) } else { best })
}
