use super::PartitionPlan;

/// Maps pivot row indices to the rank holding that row.
///
/// Row boundaries are read from the plan once; lookups move a cursor forward
/// only, since later pivot rows always live in later blocks.
#[derive(Debug, Clone)]
pub struct PivotOwnership {
    /// Exclusive end row of each rank's block.
    ends: Vec<usize>,
    owner: usize,
}

impl PivotOwnership {
    pub fn new(plan: &PartitionPlan) -> Self {
        let ends = (0..plan.workers()).map(|rank| plan.rows(rank).end).collect();
        Self { ends, owner: 0 }
    }

    /// Rank owning global row `k`. `k` must not decrease between calls.
    pub fn owner_of(&mut self, k: usize) -> usize {
        debug_assert!(
            self.owner == 0 || k >= self.ends[self.owner - 1],
            "pivot row {k} is behind the ownership cursor"
        );
        while self.owner + 1 < self.ends.len() && k >= self.ends[self.owner] {
            self.owner += 1;
        }
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::BalancePolicy;

    #[test]
    fn owner_advances_with_pivot() {
        let plan = PartitionPlan::new(10, 4, BalancePolicy::FrontLoaded).unwrap();
        let mut owners = PivotOwnership::new(&plan);
        let seen: Vec<usize> = (0..9).map(|k| owners.owner_of(k)).collect();
        assert_eq!(seen, vec![0, 0, 0, 1, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn owner_matches_row_ranges() {
        for policy in [BalancePolicy::TailHeavy, BalancePolicy::FrontLoaded] {
            let plan = PartitionPlan::new(11, 3, policy).unwrap();
            let mut owners = PivotOwnership::new(&plan);
            for k in 0..10 {
                let owner = owners.owner_of(k);
                assert!(plan.rows(owner).contains(&k), "{policy:?}: row {k}");
            }
        }
    }

    #[test]
    fn single_worker_owns_everything() {
        let plan = PartitionPlan::new(5, 1, BalancePolicy::TailHeavy).unwrap();
        let mut owners = PivotOwnership::new(&plan);
        assert!((0..4).all(|k| owners.owner_of(k) == 0));
    }
}
