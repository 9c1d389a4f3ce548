//! In-place partitioning of point runs for recursive cell splits.

use std::cmp::Ordering;

use rand::Rng;

use crate::celldata::{CellData, Payload};
use crate::geom::Position;

/// Policy for placing the split plane along the widest axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitMethod {
    /// Split at the mean coordinate of the contained points.
    #[default]
    Mean,
    /// Split at the median coordinate.
    Median,
    /// Split at the midpoint between the extreme coordinates.
    Middle,
    /// Split at a uniformly random position between the extremes.
    Random,
}

impl SplitMethod {
    /// Decode the integer codes used on the C boundary:
    /// 0 = Mean, 1 = Median, 2 = Middle, 3 = Random.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SplitMethod::Mean),
            1 => Some(SplitMethod::Median),
            2 => Some(SplitMethod::Middle),
            3 => Some(SplitMethod::Random),
            _ => None,
        }
    }
}

/// Reorder `points` so that a prefix lies at or below the split plane and
/// the suffix lies strictly above it, returning the boundary index.
///
/// The plane is perpendicular to the embedding axis of largest spread
/// (one of the three Cartesian axes for spherical points). Points whose
/// coordinate equals the plane go left. If the chosen plane would leave
/// either side empty, the call falls back to a Median split so the
/// recursion always makes progress.
///
/// Callers must pass at least two points.
pub fn split_points<P, K, R>(
    points: &mut [CellData<P, K>],
    method: SplitMethod,
    rng: &mut R,
) -> usize
where
    P: Position,
    K: Payload,
    R: Rng,
{
    debug_assert!(points.len() >= 2);

    let (axis, lo, hi) = widest_axis(points);

    let mid = match method {
        SplitMethod::Median => return split_median(points, axis),
        SplitMethod::Mean => {
            let mean =
                points.iter().map(|p| p.pos().coord(axis)).sum::<f64>() / points.len() as f64;
            partition_at(points, axis, mean)
        }
        SplitMethod::Middle => partition_at(points, axis, 0.5 * (lo + hi)),
        SplitMethod::Random => partition_at(points, axis, rng.random_range(lo..=hi)),
    };

    if mid == 0 || mid == points.len() {
        split_median(points, axis)
    } else {
        mid
    }
}

/// The embedding axis with the largest coordinate spread, with the extreme
/// coordinates along that axis.
fn widest_axis<P: Position, K: Payload>(points: &[CellData<P, K>]) -> (usize, f64, f64) {
    let mut best = (0, f64::INFINITY, f64::NEG_INFINITY);
    let mut best_spread = f64::NEG_INFINITY;

    for axis in 0..P::NDIM {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for p in points {
            let v = p.pos().coord(axis);
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        let spread = hi - lo;
        if spread > best_spread {
            best_spread = spread;
            best = (axis, lo, hi);
        }
    }

    best
}

/// Move points with `coord(axis) <= value` to the front; return the count.
fn partition_at<P: Position, K: Payload>(
    points: &mut [CellData<P, K>],
    axis: usize,
    value: f64,
) -> usize {
    let mut store = 0;
    for i in 0..points.len() {
        if points[i].pos().coord(axis) <= value {
            points.swap(i, store);
            store += 1;
        }
    }
    store
}

/// Partition around the median coordinate. Always interior for len >= 2.
fn split_median<P: Position, K: Payload>(points: &mut [CellData<P, K>], axis: usize) -> usize {
    let mid = points.len() / 2;
    points.select_nth_unstable_by(mid, |a, b| {
        a.pos()
            .coord(axis)
            .partial_cmp(&b.pos().coord(axis))
            .unwrap_or(Ordering::Equal)
    });
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celldata::Count;
    use crate::geom::{FlatPoint, SpherePoint};
    use rand_xoshiro::Xoshiro256PlusPlus;
    use rand_xoshiro::rand_core::SeedableRng;

    fn flat(xs: &[(f64, f64)]) -> Vec<CellData<FlatPoint, Count>> {
        xs.iter()
            .map(|&(x, y)| CellData::single(FlatPoint::new(x, y), Count, 1.0))
            .collect()
    }

    fn assert_partitioned(points: &[CellData<FlatPoint, Count>], mid: usize, axis: usize) {
        assert!(mid > 0 && mid < points.len(), "split must be interior");
        let left_max = points[..mid]
            .iter()
            .map(|p| p.pos().coord(axis))
            .fold(f64::NEG_INFINITY, f64::max);
        let right_min = points[mid..]
            .iter()
            .map(|p| p.pos().coord(axis))
            .fold(f64::INFINITY, f64::min);
        assert!(
            left_max <= right_min,
            "left max {left_max} exceeds right min {right_min}"
        );
    }

    #[test]
    fn mean_split_is_interior_and_ordered() {
        let mut points = flat(&[(5.0, 0.0), (1.0, 0.0), (9.0, 0.0), (2.0, 0.0), (8.0, 0.0)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mid = split_points(&mut points, SplitMethod::Mean, &mut rng);
        // mean x = 5.0; {1, 2, 5} go left
        assert_eq!(mid, 3);
        assert_partitioned(&points, mid, 0);
    }

    #[test]
    fn median_split_balances() {
        let mut points = flat(&[(4.0, 0.0), (0.0, 0.0), (3.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mid = split_points(&mut points, SplitMethod::Median, &mut rng);
        assert_eq!(mid, 2);
        assert_partitioned(&points, mid, 0);
    }

    #[test]
    fn middle_split_uses_extremes() {
        // Midpoint of [0, 10] is 5; only x=10 lies above it.
        let mut points = flat(&[(10.0, 0.0), (0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mid = split_points(&mut points, SplitMethod::Middle, &mut rng);
        assert_eq!(mid, 3);
        assert_partitioned(&points, mid, 0);
    }

    #[test]
    fn widest_axis_wins() {
        // Spread is 1 in x but 100 in y, so the split must order by y.
        let mut points = flat(&[(0.0, 50.0), (1.0, 0.0), (0.5, 100.0), (0.2, 60.0)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mid = split_points(&mut points, SplitMethod::Middle, &mut rng);
        assert_partitioned(&points, mid, 1);
    }

    #[test]
    fn identical_points_fall_back_to_median() {
        let mut points = flat(&[(1.0, 1.0); 6]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mid = split_points(&mut points, SplitMethod::Mean, &mut rng);
        assert_eq!(mid, 3);
    }

    #[test]
    fn two_points_always_split_one_one() {
        for method in [
            SplitMethod::Mean,
            SplitMethod::Median,
            SplitMethod::Middle,
            SplitMethod::Random,
        ] {
            let mut points = flat(&[(7.0, 0.0), (3.0, 0.0)]);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
            let mid = split_points(&mut points, method, &mut rng);
            assert_eq!(mid, 1, "{method:?}");
            assert!(points[0].pos().x() <= points[1].pos().x());
        }
    }

    #[test]
    fn random_split_reproducible() {
        let base = [(5.0, 1.0), (1.0, 2.0), (9.0, 0.5), (2.0, 3.0), (8.0, 1.5), (4.0, 2.5)];
        let run = |seed: u64| {
            let mut points = flat(&base);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let mid = split_points(&mut points, SplitMethod::Random, &mut rng);
            let xs: Vec<f64> = points.iter().map(|p| p.pos().x()).collect();
            (mid, xs)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn sphere_splits_on_embedding_axis() {
        // Points spread along the equator: the y axis of the embedding has
        // the largest spread.
        let mut points: Vec<CellData<SpherePoint, Count>> = [-0.4, -0.1, 0.2, 0.5]
            .iter()
            .map(|&ra| CellData::single(SpherePoint::from_radec(ra, 0.0), Count, 1.0))
            .collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mid = split_points(&mut points, SplitMethod::Median, &mut rng);
        assert_eq!(mid, 2);
        let left_max = points[..mid]
            .iter()
            .map(|p| p.pos().coord(1))
            .fold(f64::NEG_INFINITY, f64::max);
        let right_min = points[mid..]
            .iter()
            .map(|p| p.pos().coord(1))
            .fold(f64::INFINITY, f64::min);
        assert!(left_max <= right_min);
    }
}
