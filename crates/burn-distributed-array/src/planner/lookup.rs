/// Lists shorter than this are scanned linearly.
const LINEAR_SCAN_LEN: usize = 5;

/// Index of the entry of the ascending `divisors` closest to `key`.
///
/// Ties go to the lower index. Short lists are scanned linearly; longer lists are bisected to
/// the first entry not below `key`, which is then compared with its two neighbors.
pub fn nearest_divisor(divisors: &[usize], key: f64) -> usize {
    if divisors.len() <= 1 {
        return 0;
    }
    let distance = |i: usize| (key - divisors[i] as f64).abs();

    if divisors.len() <= LINEAR_SCAN_LEN {
        let mut nearest = 0;
        for i in 1..divisors.len() {
            if distance(i) < distance(nearest) {
                nearest = i;
            }
        }
        return nearest;
    }

    let (mut low, mut high) = (0, divisors.len() - 1);
    while low < high {
        let mid = (low + high) / 2;
        if key > divisors[mid] as f64 {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    let last = (low + 1).min(divisors.len() - 1);
    let mut nearest = low.saturating_sub(1);
    for i in nearest + 1..=last {
        if distance(i) < distance(nearest) {
            nearest = i;
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_the_closest_divisor() {
        let divisors = [1, 2, 4, 5, 10, 20];

        assert_eq!(nearest_divisor(&divisors, 7.0), 3);
        assert_eq!(nearest_divisor(&divisors, 0.2), 0);
        assert_eq!(nearest_divisor(&divisors, 14.9), 4);
        assert_eq!(nearest_divisor(&divisors, 100.0), 5);
    }

    #[test]
    fn test_ties_go_to_the_lower_index() {
        assert_eq!(nearest_divisor(&[1, 5], 3.0), 0);
        assert_eq!(nearest_divisor(&[1, 2, 3, 4, 6, 8, 12, 24], 5.0), 3);
        assert_eq!(nearest_divisor(&[1, 2, 3, 4, 6, 8, 12, 24], 18.0), 6);
    }

    #[test]
    fn test_single_entry_is_always_chosen() {
        assert_eq!(nearest_divisor(&[1], 42.0), 0);
    }

    #[test]
    fn test_bisection_agrees_with_a_linear_scan() {
        let divisors = [1, 2, 3, 4, 6, 8, 12, 16, 24, 48];
        for tenths in 0..600 {
            let key = tenths as f64 / 10.0;
            let expected = (0..divisors.len())
                .min_by(|&a, &b| {
                    let da = (key - divisors[a] as f64).abs();
                    let db = (key - divisors[b] as f64).abs();
                    da.partial_cmp(&db).unwrap().then(a.cmp(&b))
                })
                .unwrap();
            assert_eq!(nearest_divisor(&divisors, key), expected, "key {key}");
        }
    }
}
