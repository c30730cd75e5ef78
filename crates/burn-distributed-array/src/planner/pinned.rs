use super::{Bias, DistributionPlan, Planner, PrimeFactorHeuristic, Split, admissible};
use crate::{ArrayShape, BlockSizes, Dims};

/// Default ratio under which the dispatcher's heuristic falls back to the exhaustive search.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Plans arrays whose caller fixed the block size of some dimensions.
///
/// A nonzero block pins its dimension: the grid entry is the smallest divisor of the processes
/// still unassigned that is at least `ceil(extent / block)`, or all of them when fewer remain.
/// Pinned dimensions are handled from the last to the first. The dimensions with a zero block
/// are then planned together by the [`PrimeFactorHeuristic`] over the processes left, and
/// their blocks become `ceil(extent / p)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinnedDispatcher {
    threshold: f64,
    bias: Bias,
}

impl PinnedDispatcher {
    /// Creates the dispatcher with the threshold and bias of its heuristic.
    pub fn new(threshold: f64, bias: Bias) -> Self {
        Self { threshold, bias }
    }
}

impl Default for PinnedDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, Bias::Balanced)
    }
}

impl Planner for PinnedDispatcher {
    fn plan(&self, extents: &ArrayShape, npes: usize, blocks: &BlockSizes) -> DistributionPlan {
        if !admissible(extents, npes, blocks) {
            return DistributionPlan::zeroed(extents.ndim());
        }
        let ndim = extents.ndim();
        let mut grid: Dims<Option<usize>> = Dims::from_fn(ndim, |_| None);
        let mut resolved = *blocks;
        let mut remaining = npes;

        for i in (0..ndim).rev() {
            if blocks[i] == 0 {
                continue;
            }
            let wanted = extents[i].div_ceil(blocks[i]);
            let p = if wanted > remaining {
                core::mem::replace(&mut remaining, 1)
            } else {
                let p = (wanted..remaining)
                    .find(|p| remaining % p == 0)
                    .unwrap_or(remaining);
                remaining /= p;
                p
            };
            grid[i] = Some(p);
            // Widened so that `p` blocks cover the whole extent.
            resolved[i] = blocks[i].min(extents[i]).max(extents[i].div_ceil(p));
        }

        let free: Dims<usize> = {
            let count = grid.iter().filter(|p| p.is_none()).count();
            let mut free = Dims::from_fn(count, |_| 0);
            for (slot, i) in free.iter_mut().zip((0..ndim).filter(|&i| grid[i].is_none())) {
                *slot = i;
            }
            free
        };

        if free.ndim() > 0 {
            let sub_extents = free.map(|i| extents[i]);
            let sub_blocks = free.map(|_| 1);
            let sub = PrimeFactorHeuristic::new(self.threshold, self.bias).plan(
                &sub_extents,
                remaining,
                &sub_blocks,
            );
            if !sub.is_valid() {
                return DistributionPlan::zeroed(ndim);
            }
            for (k, &i) in free.iter().enumerate() {
                grid[i] = Some(sub.grid()[k]);
                resolved[i] = extents[i].div_ceil(sub.grid()[k]);
            }
        }

        let grid = grid.map(|p| p.unwrap_or(1));
        let splits = blocks.map(|b| if b == 0 { Split::Balanced } else { Split::Blocked });
        let plan = DistributionPlan::new(grid, resolved, splits);
        log::debug!("extents {extents} with blocks {blocks} over {npes} processes: {plan}");
        plan
    }
}
