use crate::{BlockSizes, Dims};

/// Load balance ratio of splitting `extents` over `grid`.
///
/// The ratio is the product over all dimensions of `(extent / p) * p / extent` (integer
/// division), i.e. the share of the array that an even split covers without padding. It is
/// `1.0` exactly when every grid entry divides its extent, and drops to `0.0` when a dimension
/// has more processes than elements.
pub fn evaluate(extents: &[usize], grid: &[usize]) -> f64 {
    debug_assert_eq!(extents.len(), grid.len());
    extents
        .iter()
        .zip(grid)
        .fold(1.0, |ratio, (&n, &p)| ratio * (((n / p) * p) as f64 / n as f64))
}

/// Local extents of the process holding the lowest global indices: `max(1, extent / p)`.
pub fn resolve_blocks(extents: &[usize], grid: &[usize]) -> BlockSizes {
    Dims::from_fn(extents.len(), |i| (extents[i] / grid[i]).max(1))
}

/// Sum over every dimension `k` of the product of `extent / p` over the other dimensions.
///
/// A proxy for the surface exchanged by operations on the distributed array; saturates
/// instead of wrapping for very large arrays.
pub fn communication_volume(extents: &[usize], grid: &[usize]) -> u128 {
    (0..extents.len())
        .map(|k| {
            (0..extents.len())
                .filter(|&j| j != k)
                .fold(1u128, |volume, j| volume.saturating_mul((extents[j] / grid[j]) as u128))
        })
        .fold(0u128, u128::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_is_perfectly_balanced() {
        assert_eq!(evaluate(&[100, 100], &[2, 2]), 1.0);
        assert_eq!(evaluate(&[12, 30, 7], &[4, 5, 7]), 1.0);
    }

    #[test]
    fn test_uneven_split_loses_the_remainder() {
        // 10 / 4 covers 8 of 10 elements, 9 / 3 covers all of them.
        assert_eq!(evaluate(&[10, 9], &[4, 3]), 0.8);
        assert!(evaluate(&[7], &[2]) < 1.0);
    }

    #[test]
    fn test_ratio_stays_in_the_unit_interval() {
        for n in 1..40 {
            for p in 1..=n {
                let ratio = evaluate(&[n], &[p]);
                assert!(ratio > 0.0 && ratio <= 1.0, "n={n} p={p} ratio={ratio}");
                assert_eq!(ratio == 1.0, n % p == 0, "n={n} p={p}");
            }
        }
    }

    #[test]
    fn test_resolved_blocks_never_drop_below_one() {
        assert_eq!(&*resolve_blocks(&[100, 3], &[8, 4]), &[12, 1]);
    }

    #[test]
    fn test_communication_volume_sums_cross_sections() {
        // Cross sections: (10/2)*(20/4) for k=2, (10/2)*(30/3) for k=1, (20/4)*(30/3) for k=0.
        assert_eq!(communication_volume(&[10, 20, 30], &[2, 4, 3]), 25 + 50 + 50);
        assert_eq!(communication_volume(&[10, 20], &[1, 1]), 30);
    }
}
