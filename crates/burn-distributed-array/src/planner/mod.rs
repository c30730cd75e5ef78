//! Distribution planning: choosing a process grid and block sizes for an array.
//!
//! Every planner follows the same contract. Given the extents of an array, the number of
//! processes `npes` and the requested blocking granularity (`0` meaning unconstrained), it
//! returns a [`DistributionPlan`] whose grid has one positive entry per dimension with a
//! product of at most `npes`, and whose block sizes are the local extents owned by the process
//! holding the element with the lowest global indices.
//!
//! Four planners are provided:
//!
//! | Planner | Method |
//! |---|---|
//! | [`ExhaustiveSearch`] | Enumerates every factorization of `npes` over the dimensions. |
//! | [`RelaxedHeuristic`] | Solves the continuous problem, snaps to divisors, swaps factors. |
//! | [`PrimeFactorHeuristic`] | Deals the prime factors of `npes` to the dimensions greedily. |
//! | [`PinnedDispatcher`] | Derives the grid of dimensions with a block, solves the rest. |
//!
//! Both heuristics fall back to the exhaustive search when their load balance ratio stays
//! below the caller's threshold. Planning is pure: identical inputs always give identical plans.

mod evaluate;
mod exhaustive;
mod lookup;
mod pinned;
mod prime;
mod relaxed;

pub use evaluate::*;
pub use exhaustive::*;
pub use lookup::*;
pub use pinned::*;
pub use prime::*;
pub use relaxed::*;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::{ArrayShape, BlockSizes, Dims, ProcessGrid};

/// Computes a distribution plan for an array over a group of processes.
pub trait Planner: fmt::Debug {
    /// Plans `extents` over `npes` processes honoring the requested `blocks`.
    ///
    /// An invalid request or a scratch allocation failure yields a plan with zeroed block sizes,
    /// see [`DistributionPlan::is_valid`].
    fn plan(&self, extents: &ArrayShape, npes: usize, blocks: &BlockSizes) -> DistributionPlan;
}

/// How the elements of one dimension are dealt to the processes along it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Split {
    /// Every process gets `extent / p` elements, the lowest `extent % p` coordinates one more.
    #[default]
    Balanced,
    /// Consecutive blocks of the planned block size, the trailing processes may get less.
    Blocked,
}

/// Output of a planner: the process grid and the resolved block sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistributionPlan {
    grid: ProcessGrid,
    blocks: BlockSizes,
    splits: Dims<Split>,
}

impl DistributionPlan {
    /// A plan whose dimensions are all split evenly.
    pub fn balanced(grid: ProcessGrid, blocks: BlockSizes) -> Self {
        Self::new(grid, blocks, grid.map(|_| Split::Balanced))
    }

    pub(crate) fn new(grid: ProcessGrid, blocks: BlockSizes, splits: Dims<Split>) -> Self {
        debug_assert_eq!(grid.ndim(), blocks.ndim());
        debug_assert_eq!(grid.ndim(), splits.ndim());
        Self {
            grid,
            blocks,
            splits,
        }
    }

    /// The unusable plan returned when planning fails.
    pub(crate) fn zeroed(ndim: usize) -> Self {
        let zeros = Dims::from_fn(ndim, |_| 0);
        Self::balanced(zeros, zeros)
    }

    /// Number of processes along each dimension.
    pub fn grid(&self) -> &ProcessGrid {
        &self.grid
    }

    /// Local extents of the process owning the lowest global indices.
    pub fn blocks(&self) -> &BlockSizes {
        &self.blocks
    }

    /// How each dimension is dealt to its processes.
    pub fn splits(&self) -> &Dims<Split> {
        &self.splits
    }

    /// `false` for the zeroed plan of a failed planning run.
    pub fn is_valid(&self) -> bool {
        self.grid.iter().all(|&p| p >= 1) && self.blocks.iter().all(|&b| b >= 1)
    }

    /// Number of processes that own a position in the grid.
    pub fn processes(&self) -> usize {
        // A grid never holds more processes than its group, so the product cannot overflow.
        self.grid.volume().unwrap_or(usize::MAX)
    }

    /// Grid coordinates of `rank`, the last dimension varying fastest.
    ///
    /// Ranks beyond the grid own nothing and have no coordinates.
    pub fn coords(&self, rank: usize) -> Option<Dims> {
        if !self.is_valid() || rank >= self.processes() {
            return None;
        }
        let mut coords = self.grid.map(|_| 0);
        let mut rest = rank;
        for (coord, &p) in coords.iter_mut().zip(self.grid.iter()).rev() {
            *coord = rest % p;
            rest /= p;
        }
        Some(coords)
    }

    /// Local extents owned by `rank` for an array of the given `extents`.
    pub fn local_shape(&self, extents: &ArrayShape, rank: usize) -> Dims {
        let Some(coords) = self.coords(rank) else {
            return extents.map(|_| 0);
        };
        Dims::from_fn(extents.ndim(), |i| {
            let (n, p, c) = (extents[i], self.grid[i], coords[i]);
            match self.splits[i] {
                Split::Balanced => n / p + usize::from(c < n % p),
                Split::Blocked => {
                    let b = self.blocks[i];
                    n.saturating_sub(c * b).min(b)
                }
            }
        })
    }

    /// Number of elements owned by `rank`, or `None` when it overflows `usize`.
    pub fn local_len(&self, extents: &ArrayShape, rank: usize) -> Option<usize> {
        self.local_shape(extents, rank).volume()
    }
}

impl fmt::Display for DistributionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid {} blocks {}", self.grid, self.blocks)
    }
}

/// Direction in which the prime factor heuristic favors distributing axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    /// Prefer the leftmost axes.
    Leading,
    /// Deal factors evenly over the axes.
    #[default]
    Balanced,
    /// Prefer the rightmost axes.
    Trailing,
}

impl From<i64> for Bias {
    fn from(bias: i64) -> Self {
        match bias.signum() {
            -1 => Bias::Leading,
            0 => Bias::Balanced,
            _ => Bias::Trailing,
        }
    }
}

/// Selects one of the planners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// [`ExhaustiveSearch`].
    Exhaustive,
    /// [`RelaxedHeuristic`].
    Relaxed,
    /// [`PrimeFactorHeuristic`].
    PrimeFactor,
    /// [`PinnedDispatcher`].
    #[default]
    Pinned,
}

impl Strategy {
    /// Builds the selected planner.
    pub fn planner(self, threshold: f64, bias: Bias) -> Box<dyn Planner> {
        match self {
            Strategy::Exhaustive => Box::new(ExhaustiveSearch::new(threshold)),
            Strategy::Relaxed => Box::new(RelaxedHeuristic::new(threshold)),
            Strategy::PrimeFactor => Box::new(PrimeFactorHeuristic::new(threshold, bias)),
            Strategy::Pinned => Box::new(PinnedDispatcher::new(threshold, bias)),
        }
    }
}

impl FromStr for Strategy {
    type Err = alloc::string::String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exhaustive" | "ex" => Ok(Strategy::Exhaustive),
            "relaxed" | "h1" => Ok(Strategy::Relaxed),
            "prime_factor" | "prime" | "h2" => Ok(Strategy::PrimeFactor),
            "pinned" | "ddb" => Ok(Strategy::Pinned),
            _ => Err(alloc::format!("unknown planning strategy '{s}'")),
        }
    }
}

/// Rounding used to count how many blocks fit in a dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rounding {
    Down,
    Up,
}

/// Block sizes clamped to `[1, extent]` and the number of blocks per dimension.
pub(crate) fn granularity(
    extents: &ArrayShape,
    blocks: &BlockSizes,
    rounding: Rounding,
) -> (BlockSizes, Dims) {
    let widened = Dims::from_fn(extents.ndim(), |i| blocks[i].max(1).min(extents[i]));
    let units = Dims::from_fn(extents.ndim(), |i| match rounding {
        Rounding::Down => extents[i] / widened[i],
        Rounding::Up => extents[i].div_ceil(widened[i]),
    });
    (widened, units)
}

/// Whether the planner inputs satisfy the planning contract.
pub(crate) fn admissible(extents: &ArrayShape, npes: usize, blocks: &BlockSizes) -> bool {
    let ok = npes >= 1 && extents.ndim() == blocks.ndim() && extents.iter().all(|&n| n >= 1);
    if !ok {
        log::warn!("cannot plan extents {extents} with blocks {blocks} over {npes} processes");
    }
    ok
}

/// Ascending divisors of `n`, or `None` when the scratch buffer cannot be allocated.
pub(crate) fn divisors(n: usize) -> Option<Vec<usize>> {
    let count = (1..=n).filter(|d| n % d == 0).count();
    let mut divisors = Vec::new();
    if divisors.try_reserve_exact(count).is_err() {
        log::warn!(
            target: "burn_distributed_array::alloc",
            "cannot allocate {count} divisors of {n}"
        );
        return None;
    }
    divisors.extend((1..=n).filter(|d| n % d == 0));
    Some(divisors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn shape(dims: &[usize]) -> ArrayShape {
        ArrayShape::new(dims).unwrap()
    }

    #[test]
    fn test_granularity_widens_oversized_blocks_to_the_extent() {
        let (blocks, units) = granularity(
            &shape(&[50, 7, 9]),
            &shape(&[10, 20, 0]),
            Rounding::Down,
        );

        assert_eq!(&*blocks, &[10, 7, 1]);
        assert_eq!(&*units, &[5, 1, 9]);
    }

    #[test]
    fn test_granularity_rounds_partial_blocks_up() {
        let (_, units) = granularity(&shape(&[50, 7]), &shape(&[3, 2]), Rounding::Up);

        assert_eq!(&*units, &[17, 4]);
    }

    #[test]
    fn test_divisors_are_ascending() {
        assert_eq!(divisors(12).unwrap(), [1, 2, 3, 4, 6, 12]);
        assert_eq!(divisors(1).unwrap(), [1]);
    }

    #[test]
    fn test_coords_are_row_major() {
        let plan = DistributionPlan::balanced(shape(&[2, 3]), shape(&[5, 4]));

        assert_eq!(&*plan.coords(0).unwrap(), &[0, 0]);
        assert_eq!(&*plan.coords(4).unwrap(), &[1, 1]);
        assert_eq!(&*plan.coords(5).unwrap(), &[1, 2]);
        assert_eq!(plan.coords(6), None);
    }

    #[test]
    fn test_balanced_split_hands_the_remainder_to_low_coordinates() {
        let extents = shape(&[10]);
        let plan = DistributionPlan::balanced(shape(&[4]), shape(&[3]));

        let lens: Vec<usize> = (0..5).map(|r| plan.local_len(&extents, r).unwrap()).collect();
        assert_eq!(lens, [3, 3, 2, 2, 0]);
    }

    #[test]
    fn test_blocked_split_leaves_trailing_processes_short() {
        let extents = shape(&[50]);
        let splits = Dims::from_fn(1, |_| Split::Blocked);
        let plan = DistributionPlan::new(shape(&[6]), shape(&[9]), splits);

        let lens: Vec<usize> = (0..6).map(|r| plan.local_len(&extents, r).unwrap()).collect();
        assert_eq!(lens, [9, 9, 9, 9, 9, 5]);
    }

    #[test]
    fn test_zeroed_plan_is_invalid() {
        let plan = DistributionPlan::zeroed(2);

        assert!(!plan.is_valid());
        assert_eq!(plan.coords(0), None);
        assert_eq!(plan.local_len(&shape(&[4, 4]), 0), Some(0));
    }

    #[rstest]
    #[case(-3, Bias::Leading)]
    #[case(0, Bias::Balanced)]
    #[case(7, Bias::Trailing)]
    fn test_bias_follows_the_sign(#[case] raw: i64, #[case] expected: Bias) {
        assert_eq!(Bias::from(raw), expected);
    }

    #[rstest]
    #[case("exhaustive", Strategy::Exhaustive)]
    #[case("H1", Strategy::Relaxed)]
    #[case("prime_factor", Strategy::PrimeFactor)]
    #[case("ddb", Strategy::Pinned)]
    fn test_strategies_parse_from_names(#[case] name: &str, #[case] expected: Strategy) {
        assert_eq!(name.parse::<Strategy>(), Ok(expected));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!("simulated_annealing".parse::<Strategy>().is_err());
    }
}
