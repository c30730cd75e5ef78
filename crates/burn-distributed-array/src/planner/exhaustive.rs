use core::ops::ControlFlow;

use super::{DistributionPlan, Planner, Rounding, admissible, granularity};
use super::{communication_volume, evaluate, resolve_blocks};
use crate::{ArrayShape, BlockSizes, Dims, ProcessGrid};

/// Enumerates every way of writing `npes` as an ordered product of one factor per dimension.
///
/// The candidate with the best load balance ratio wins, ties going to the smallest
/// [communication volume](communication_volume). Candidates are visited factor by factor, each
/// factor increasing through the divisors of the processes left by the previous ones, and the
/// search stops as soon as the best ratio exceeds the threshold. Exponential in the worst case;
/// the heuristics use it as a fallback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExhaustiveSearch {
    threshold: f64,
}

impl ExhaustiveSearch {
    /// Creates the planner; the search stops once a ratio above `threshold` is found.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Best grid for `units` blocks per dimension over exactly `npes` processes.
    pub(crate) fn search(&self, units: &Dims, npes: usize) -> ProcessGrid {
        let mut search = Search {
            units,
            threshold: self.threshold,
            current: units.map(|_| 1),
            best: Dims::from_fn(units.ndim(), |i| if i == 0 { npes } else { 1 }),
            best_ratio: -1.0,
            best_volume: u128::MAX,
            visited: 0,
        };
        let _ = search.descend(0, npes);
        log::trace!(
            "exhaustive search over {npes} processes visited {} grids, best {} (ratio {})",
            search.visited,
            search.best,
            search.best_ratio
        );
        search.best
    }
}

impl Planner for ExhaustiveSearch {
    fn plan(&self, extents: &ArrayShape, npes: usize, blocks: &BlockSizes) -> DistributionPlan {
        if !admissible(extents, npes, blocks) {
            return DistributionPlan::zeroed(extents.ndim());
        }
        if extents.ndim() == 1 {
            let grid = extents.map(|_| npes);
            return DistributionPlan::balanced(grid, resolve_blocks(extents, &grid));
        }

        let (_, units) = granularity(extents, blocks, Rounding::Down);
        let grid = self.search(&units, npes);
        DistributionPlan::balanced(grid, resolve_blocks(extents, &grid))
    }
}

struct Search<'a> {
    units: &'a Dims,
    threshold: f64,
    current: ProcessGrid,
    best: ProcessGrid,
    best_ratio: f64,
    best_volume: u128,
    visited: usize,
}

impl Search<'_> {
    fn descend(&mut self, depth: usize, remaining: usize) -> ControlFlow<()> {
        if depth + 1 == self.units.ndim() {
            self.current[depth] = remaining;
            self.consider();
            return if self.best_ratio > self.threshold {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            };
        }

        for factor in (1..=remaining).filter(|f| remaining % f == 0) {
            self.current[depth] = factor;
            self.descend(depth + 1, remaining / factor)?;
        }
        ControlFlow::Continue(())
    }

    fn consider(&mut self) {
        self.visited += 1;
        let ratio = evaluate(self.units, &self.current);
        let volume = communication_volume(self.units, &self.current);
        if ratio > self.best_ratio || (ratio == self.best_ratio && volume < self.best_volume) {
            self.best = self.current;
            self.best_ratio = ratio;
            self.best_volume = volume;
        }
    }
}
