use alloc::vec::Vec;

use super::{
    DistributionPlan, ExhaustiveSearch, Planner, Rounding, admissible, divisors, granularity,
};
use super::{evaluate, nearest_divisor, resolve_blocks};
use crate::{ArrayShape, BlockSizes, Dims, ProcessGrid};

/// Solves the continuous problem and snaps it to a nearby integer grid.
///
/// Treating process counts as reals, the grid proportional to the extents has a closed form.
/// Dimension by dimension, the relaxed count is replaced by the nearest divisor of the
/// processes still unassigned and the remaining dimensions are solved again. Swapping the factor
/// of the worst balanced dimension with another one then refines the grid while it helps. Falls
/// back to [`ExhaustiveSearch`] when the ratio ends below the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelaxedHeuristic {
    threshold: f64,
}

impl RelaxedHeuristic {
    /// Creates the planner; ratios below `threshold` trigger the exhaustive search.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Planner for RelaxedHeuristic {
    fn plan(&self, extents: &ArrayShape, npes: usize, blocks: &BlockSizes) -> DistributionPlan {
        if !admissible(extents, npes, blocks) {
            return DistributionPlan::zeroed(extents.ndim());
        }
        if extents.ndim() == 1 {
            let grid = extents.map(|_| npes);
            return DistributionPlan::balanced(grid, resolve_blocks(extents, &grid));
        }

        let (_, units) = granularity(extents, blocks, Rounding::Down);
        let Some(divisors) = divisors(npes) else {
            return DistributionPlan::zeroed(extents.ndim());
        };

        let relaxed = relax(&units, 0, npes);
        let snapped = snap(&units, relaxed, npes, divisors);
        let mut grid = refine(&units, snapped);
        let ratio = evaluate(&units, &grid);
        log::debug!("relaxed heuristic snapped {snapped} and refined to {grid} (ratio {ratio})");

        if ratio < self.threshold {
            log::debug!("ratio {ratio} below {}, searching exhaustively", self.threshold);
            grid = *ExhaustiveSearch::new(self.threshold)
                .plan(extents, npes, blocks)
                .grid();
        }
        DistributionPlan::balanced(grid, resolve_blocks(extents, &grid))
    }
}

/// Real process counts for dimensions `from..` sharing `npes` processes proportionally to `units`.
///
/// With `q_from = (npes / prod(u_i / u_from))^(1 / d)` over the `d` remaining dimensions, each
/// `q_i = (u_i / u_from) * q_from`.
fn relax(units: &Dims, from: usize, npes: usize) -> Dims<f64> {
    let base = units[from] as f64;
    let remaining = units.ndim() - from;
    let head = units[from + 1..]
        .iter()
        .fold(npes as f64, |head, &u| head / (u as f64 / base));
    let head = libm::pow(head, 1.0 / remaining as f64);

    Dims::from_fn(units.ndim(), |i| match i {
        i if i < from => 0.0,
        i if i == from => head,
        i => units[i] as f64 / base * head,
    })
}

/// Replaces each relaxed count by the nearest divisor of the processes left.
fn snap(
    units: &Dims,
    mut relaxed: Dims<f64>,
    npes: usize,
    mut divisors: Vec<usize>,
) -> ProcessGrid {
    let last = units.ndim() - 1;
    let mut grid = units.map(|_| 1);
    let mut remaining = npes;

    for dim in 0..last {
        let index = nearest_divisor(&divisors, relaxed[dim]);
        let chosen = divisors[index];
        grid[dim] = chosen;
        remaining = (remaining / chosen).max(1);

        if dim + 1 < last {
            let resolved = relax(units, dim + 1, remaining);
            relaxed[dim + 1..].copy_from_slice(&resolved[dim + 1..]);

            // Keep the divisors that are multiples of the chosen one, divided by it.
            if chosen > 1 {
                let mut kept = 1;
                for i in index + 1..divisors.len() {
                    if divisors[i] % chosen == 0 {
                        divisors[kept] = divisors[i] / chosen;
                        kept += 1;
                    }
                }
                divisors.truncate(kept);
            }
        }
    }
    grid[last] = remaining;
    grid
}

/// Swaps the factor of the worst balanced dimension with the one that improves the ratio most.
fn refine(units: &Dims, grid: ProcessGrid) -> ProcessGrid {
    let mut candidate = grid;
    let mut best = evaluate(units, &candidate);

    loop {
        let previous = best;
        let worst = worst_dimension(units, &candidate);

        let mut partner = worst;
        for k in 0..units.ndim() {
            if k == worst {
                continue;
            }
            candidate.swap(worst, k);
            let ratio = evaluate(units, &candidate);
            if ratio > best {
                partner = k;
                best = ratio;
            }
            candidate.swap(worst, k);
        }
        if partner != worst {
            candidate.swap(worst, partner);
        }
        if best <= previous {
            return candidate;
        }
    }
}

/// Dimension with the largest leftover fraction `(u mod p) / p`, or `1` when `p > u`.
fn worst_dimension(units: &Dims, grid: &ProcessGrid) -> usize {
    let leftover = |k: usize| {
        let (u, p) = (units[k], grid[k]);
        let rest = if u < p { p } else { u % p };
        rest as f64 / p as f64
    };

    let mut worst = 0;
    let mut fraction = leftover(0);
    for k in 1..units.ndim() {
        let t = leftover(k);
        if t > fraction {
            worst = k;
            fraction = t;
        }
    }
    worst
}
