use alloc::vec::Vec;

use super::{
    Bias, DistributionPlan, ExhaustiveSearch, Planner, Rounding, Split, admissible, granularity,
};
use super::evaluate;
use crate::{ArrayShape, BlockSizes, Dims};

/// Deals the prime factors of the process count to the dimensions, largest factor first.
///
/// Each factor goes to the dimension whose block count it leaves with the smallest remainder
/// fraction. The [`Bias`] decides the scan order: leading and balanced scans start from the
/// first dimension, trailing scans from the last one, and a balanced scan moves its starting
/// dimension by one after every factor. Falls back to [`ExhaustiveSearch`] when the ratio ends
/// below the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrimeFactorHeuristic {
    threshold: f64,
    bias: Bias,
}

impl PrimeFactorHeuristic {
    /// Creates the planner; ratios below `threshold` trigger the exhaustive search.
    pub fn new(threshold: f64, bias: Bias) -> Self {
        Self { threshold, bias }
    }
}

impl Planner for PrimeFactorHeuristic {
    fn plan(&self, extents: &ArrayShape, npes: usize, blocks: &BlockSizes) -> DistributionPlan {
        if !admissible(extents, npes, blocks) {
            return DistributionPlan::zeroed(extents.ndim());
        }
        let ndim = extents.ndim();
        let (widened, units) = granularity(extents, blocks, Rounding::Up);
        let Some(factors) = prime_factors(npes) else {
            return DistributionPlan::zeroed(ndim);
        };

        let (mut start, step): (usize, isize) = match self.bias {
            Bias::Trailing => (ndim - 1, -1),
            Bias::Leading | Bias::Balanced => (0, 1),
        };
        let mut grid = units.map(|_| 1);
        for &factor in factors.iter().rev() {
            let leftover = |i: usize| {
                let share = factor * grid[i];
                if units[i] < share {
                    1.1
                } else {
                    (units[i] % share) as f64 / units[i] as f64
                }
            };

            let mut chosen = start;
            let mut fraction = leftover(start);
            for j in 1..ndim {
                let look = (start as isize + step * j as isize).rem_euclid(ndim as isize) as usize;
                let w = leftover(look);
                if w < fraction {
                    fraction = w;
                    chosen = look;
                }
            }
            grid[chosen] *= factor;
            if self.bias == Bias::Balanced {
                start = (start + 1) % ndim;
            }
        }

        let ratio = evaluate(&units, &grid);
        log::debug!("prime factors {factors:?} of {npes} dealt as {grid} (ratio {ratio})");
        if ratio < self.threshold {
            log::debug!("ratio {ratio} below {}, searching exhaustively", self.threshold);
            grid = *ExhaustiveSearch::new(self.threshold)
                .plan(extents, npes, blocks)
                .grid();
        }

        let resolved = Dims::from_fn(ndim, |i| {
            assert!(grid[i] > 0, "process dimension is zero: grid {grid} for extents {extents}");
            (units[i].div_ceil(grid[i]) * widened[i]).min(extents[i])
        });
        // `p` blocks of a requested size cover the extent; unconstrained dimensions stay even.
        let splits = blocks.map(|b| if b == 0 { Split::Balanced } else { Split::Blocked });
        DistributionPlan::new(grid, resolved, splits)
    }
}

/// Prime factors of `n` in ascending order, repeated by multiplicity.
fn prime_factors(n: usize) -> Option<Vec<usize>> {
    let mut factors = Vec::new();
    if factors.try_reserve(usize::BITS as usize).is_err() {
        log::warn!(target: "burn_distributed_array::alloc", "cannot allocate prime factors of {n}");
        return None;
    }
    let mut rest = n;
    let mut p = 2;
    while p * p <= rest {
        while rest % p == 0 {
            factors.push(p);
            rest /= p;
        }
        p += 1;
    }
    if rest > 1 {
        factors.push(rest);
    }
    Some(factors)
}
