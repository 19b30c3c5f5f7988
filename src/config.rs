//! Per-call execution settings.

use crate::partition::BalancePolicy;

/// Below this many flops a row block is computed on the calling thread.
///
/// Same cut-off the adaptive threading heuristic uses for a single thread.
pub const SINGLE_THREAD_FLOPS: f64 = 100_000_000.0;

/// Below this many elements a transpose runs on the calling thread.
///
/// A transpose moves one value per element and does no arithmetic, so it is
/// measured in elements rather than flops: 512 × 512.
pub const SINGLE_THREAD_TRANSPOSE_ELEMENTS: usize = 512 * 512;

/// Where the transpose variant pays for transposing the right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransposeSite {
    /// Root transposes once, then broadcasts the transpose.
    #[default]
    Root,
    /// Root broadcasts the operand untouched and every worker transposes its copy.
    Worker,
}

/// Settings carried into [`multiply_with`](crate::multiply_with) and
/// [`eliminate_with`](crate::eliminate_with).
///
/// Every worker of a group must pass an identical config, since the balance
/// policy decides the partition and therefore the message sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecConfig {
    /// Row distribution used by elimination. Multiply variants pick their own.
    pub elimination_policy: BalancePolicy,
    pub transpose_site: TransposeSite,
    /// Work (in flops) from which a worker splits its local loops across rayon's pool.
    pub parallel_threshold: f64,
    /// Matrix size (in elements) from which a transpose is split across rayon's pool.
    pub transpose_threshold: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            elimination_policy: BalancePolicy::FrontLoaded,
            transpose_site: TransposeSite::Root,
            parallel_threshold: SINGLE_THREAD_FLOPS,
            transpose_threshold: SINGLE_THREAD_TRANSPOSE_ELEMENTS,
        }
    }
}

impl ExecConfig {
    /// Forces the rayon path regardless of problem size.
    pub fn always_parallel(mut self) -> Self {
        self.parallel_threshold = 0.0;
        self.transpose_threshold = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_threshold_counts_elements() {
        let config = ExecConfig::default();
        // a 512x512 transpose is 262144 moves, far below the flop cut-off
        assert_eq!(config.transpose_threshold, 512 * 512);
        assert!((config.transpose_threshold as f64) < config.parallel_threshold);
    }

    #[test]
    fn always_parallel_clears_both_thresholds() {
        let config = ExecConfig::default().always_parallel();
        assert_eq!(config.parallel_threshold, 0.0);
        assert_eq!(config.transpose_threshold, 0);
    }
}
