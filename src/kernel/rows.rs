//! Row-parallel dispatch shared by the multiply kernel and elimination.

use rayon::prelude::*;

/// Decides whether a row loop is worth handing to rayon.
///
/// Small blocks stay on the calling thread because pool overhead dominates,
/// and a single row never splits.
pub(crate) fn worth_splitting(rows: usize, flops: f64, threshold: f64) -> bool {
    rows > 1 && flops >= threshold
}

/// Runs `f(local_row_index, row)` over every `width`-long row of `block`.
///
/// Each row is handed to exactly one call, which is what lets the parallel path
/// run without locks.
pub(crate) fn for_each_row<F>(block: &mut [f64], width: usize, parallel: bool, f: F)
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    if parallel {
        block
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    } else {
        block
            .chunks_mut(width)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_work_stays_sequential() {
        // 256x256 block: ~33M flops
        assert!(!worth_splitting(256, 2.0 * 256.0 * 256.0 * 256.0, 100_000_000.0));
        // 1024x1024 block: ~2.1B flops
        assert!(worth_splitting(1024, 2.0 * 1024.0 * 1024.0 * 1024.0, 100_000_000.0));
        // one row never splits
        assert!(!worth_splitting(1, f64::MAX, 0.0));
    }

    #[test]
    fn every_row_visited_once() {
        for parallel in [false, true] {
            let mut block = vec![0.0; 12];
            for_each_row(&mut block, 3, parallel, |i, row| {
                for cell in row.iter_mut() {
                    *cell += i as f64;
                }
            });
            assert_eq!(block, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
        }
    }
}
