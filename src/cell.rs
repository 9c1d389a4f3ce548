//! Tree nodes: a summary aggregate plus either two children or nothing.

use rand::Rng;

use crate::celldata::{CellData, Payload, bounding_size_sq};
use crate::geom::Position;
use crate::split::{SplitMethod, split_points};

/// A node of the cell tree.
///
/// A leaf covers a single catalog point (`sizesq == 0`) or a run of points
/// whose extent is at or below the minimum useful size. An internal node
/// has exactly two children whose point runs partition its own.
#[derive(Debug)]
pub struct Cell<P: Position, K: Payload> {
    data: CellData<P, K>,
    sizesq: f64,
    children: Option<Box<[Cell<P, K>; 2]>>,
}

impl<P: Position, K: Payload> Cell<P, K> {
    /// Leaf holding a single catalog point.
    pub(crate) fn leaf(data: CellData<P, K>) -> Self {
        Cell {
            data,
            sizesq: 0.0,
            children: None,
        }
    }

    /// Recursively build the subtree over `points`.
    ///
    /// `data` must be the finished summary of `points` and `sizesq` its
    /// bounding extent, both computed by the caller.
    pub(crate) fn build<R: Rng>(
        data: CellData<P, K>,
        sizesq: f64,
        points: &mut [CellData<P, K>],
        minsizesq: f64,
        method: SplitMethod,
        rng: &mut R,
    ) -> Self {
        if points.len() == 1 || sizesq <= minsizesq {
            return Cell {
                data,
                sizesq,
                children: None,
            };
        }

        let mid = split_points(points, method, rng);
        let (left_points, right_points) = points.split_at_mut(mid);
        let left = Self::build_over(left_points, minsizesq, method, rng);
        let right = Self::build_over(right_points, minsizesq, method, rng);

        Cell {
            data,
            sizesq,
            children: Some(Box::new([left, right])),
        }
    }

    /// Summarize `points` and build the subtree over them.
    fn build_over<R: Rng>(
        points: &mut [CellData<P, K>],
        minsizesq: f64,
        method: SplitMethod,
        rng: &mut R,
    ) -> Self {
        if points.len() == 1 {
            return Self::leaf(points[0]);
        }
        let mut summary = CellData::summarize(points);
        let sizesq = bounding_size_sq(summary.pos(), points);
        summary.finish_payload(points);
        Self::build(summary, sizesq, points, minsizesq, method, rng)
    }

    /// Summary aggregate over every point under this cell.
    pub fn data(&self) -> &CellData<P, K> {
        &self.data
    }

    /// Squared bounding extent: max squared distance from the centroid to
    /// any contained point.
    pub fn sizesq(&self) -> f64 {
        self.sizesq
    }

    /// Bounding extent (radius) of this cell.
    pub fn size(&self) -> f64 {
        self.sizesq.sqrt()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The two children of an internal cell.
    pub fn children(&self) -> Option<(&Cell<P, K>, &Cell<P, K>)> {
        self.children.as_ref().map(|c| (&c[0], &c[1]))
    }

    /// Visit the summary of every leaf under this cell.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&CellData<P, K>)) {
        match self.children() {
            None => f(&self.data),
            Some((left, right)) => {
                left.for_each_leaf(f);
                right.for_each_leaf(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celldata::Scalar;
    use crate::geom::{FlatPoint, SpherePoint};
    use rand_xoshiro::Xoshiro256PlusPlus;
    use rand_xoshiro::rand_core::SeedableRng;

    fn build_flat(
        rows: &[(f64, f64, f64, f64)],
        minsizesq: f64,
        method: SplitMethod,
    ) -> Cell<FlatPoint, Scalar> {
        let mut points: Vec<CellData<FlatPoint, Scalar>> = rows
            .iter()
            .map(|&(x, y, k, w)| {
                CellData::single(FlatPoint::new(x, y), Scalar::from_row(0.0, 0.0, k, w), w)
            })
            .collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        Cell::build_over(&mut points, minsizesq, method, &mut rng)
    }

    /// Recursively verify the structural invariants; returns
    /// (weight, payload, leaf count).
    fn check<P: Position, K: Payload>(
        cell: &Cell<P, K>,
        minsizesq: f64,
        payload_of: &impl Fn(&K) -> f64,
    ) -> (f64, f64, usize) {
        match cell.children() {
            None => {
                if cell.sizesq() > 0.0 {
                    assert!(
                        cell.sizesq() <= minsizesq,
                        "multi-point leaf exceeds minimum size"
                    );
                }
                (
                    cell.data().weight(),
                    payload_of(cell.data().payload()),
                    1,
                )
            }
            Some((left, right)) => {
                assert!(cell.sizesq() >= left.sizesq());
                assert!(cell.sizesq() >= right.sizesq());
                assert!(left.data().weight() > 0.0);
                assert!(right.data().weight() > 0.0);

                let (lw, lp, ln) = check(left, minsizesq, payload_of);
                let (rw, rp, rn) = check(right, minsizesq, payload_of);
                let w = cell.data().weight();
                assert!((w - (lw + rw)).abs() < 1e-10 * w.max(1.0));
                assert!((payload_of(cell.data().payload()) - (lp + rp)).abs() < 1e-10);
                (w, lp + rp, ln + rn)
            }
        }
    }

    fn grid_rows(n: usize) -> Vec<(f64, f64, f64, f64)> {
        // Deterministic xorshift positions in the unit square.
        let mut state: u64 = 99;
        let mut rng = || -> f64 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64) / (u64::MAX as f64)
        };
        (0..n)
            .map(|_| (rng(), rng(), rng() - 0.5, 0.5 + rng()))
            .collect()
    }

    #[test]
    fn single_point_is_leaf() {
        let cell = build_flat(&[(1.0, 2.0, 0.5, 2.0)], 0.01, SplitMethod::Mean);
        assert!(cell.is_leaf());
        assert!(cell.sizesq().abs() < 1e-15);
        assert!((cell.data().weight() - 2.0).abs() < 1e-15);
        assert!((cell.data().payload().0 - 1.0).abs() < 1e-15);
    }

    #[test]
    fn invariants_hold_for_all_policies() {
        let rows = grid_rows(200);
        let w_total: f64 = rows.iter().map(|r| r.3).sum();
        let p_total: f64 = rows.iter().map(|r| r.2 * r.3).sum();

        for method in [
            SplitMethod::Mean,
            SplitMethod::Median,
            SplitMethod::Middle,
            SplitMethod::Random,
        ] {
            let minsizesq = 1e-4;
            let cell = build_flat(&rows, minsizesq, method);
            let (w, p, leaves) = check(&cell, minsizesq, &|k: &Scalar| k.0);
            assert!((w - w_total).abs() < 1e-9, "{method:?}");
            assert!((p - p_total).abs() < 1e-9, "{method:?}");
            assert!(leaves >= 1 && leaves <= rows.len(), "{method:?}");
        }
    }

    #[test]
    fn minsize_zero_splits_to_single_points() {
        let rows = grid_rows(64);
        let cell = build_flat(&rows, 0.0, SplitMethod::Median);
        let mut leaves = 0;
        cell.for_each_leaf(&mut |data| {
            leaves += 1;
            assert!(data.weight() > 0.0);
        });
        assert_eq!(leaves, rows.len());
    }

    #[test]
    fn duplicate_points_collapse_to_one_leaf() {
        // All points coincide: the root has zero extent and stays a leaf
        // even with minsizesq == 0.
        let rows = vec![(3.0, 4.0, 1.0, 1.0); 8];
        let cell = build_flat(&rows, 0.0, SplitMethod::Mean);
        assert!(cell.is_leaf());
        assert!((cell.data().weight() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn centroid_consistency_flat() {
        let rows = grid_rows(50);
        let cell = build_flat(&rows, 1e-4, SplitMethod::Mean);

        fn walk(cell: &Cell<FlatPoint, Scalar>) {
            if let Some((left, right)) = cell.children() {
                let lw = left.data().weight();
                let rw = right.data().weight();
                let x = (left.data().pos().x() * lw + right.data().pos().x() * rw) / (lw + rw);
                let y = (left.data().pos().y() * lw + right.data().pos().y() * rw) / (lw + rw);
                assert!((x - cell.data().pos().x()).abs() < 1e-12);
                assert!((y - cell.data().pos().y()).abs() < 1e-12);
                walk(left);
                walk(right);
            }
        }
        walk(&cell);
    }

    #[test]
    fn sphere_centroids_stay_unit_length() {
        let mut state: u64 = 5;
        let mut rng = || -> f64 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64) / (u64::MAX as f64)
        };
        let mut points: Vec<CellData<SpherePoint, Scalar>> = (0..100)
            .map(|_| {
                let ra = rng() * 0.3;
                let dec = (rng() - 0.5) * 0.3;
                let w = 0.5 + rng();
                CellData::single(
                    SpherePoint::from_radec(ra, dec),
                    Scalar::from_row(0.0, 0.0, rng(), w),
                    w,
                )
            })
            .collect();
        let mut xo = Xoshiro256PlusPlus::seed_from_u64(3);
        let cell = Cell::build_over(&mut points, 1e-6, SplitMethod::Median, &mut xo);

        fn walk(cell: &Cell<SpherePoint, Scalar>) {
            let norm_sq: f64 = cell.data().pos().0.iter().map(|v| v * v).sum();
            assert!((norm_sq - 1.0).abs() < 1e-10);
            if let Some((left, right)) = cell.children() {
                walk(left);
                walk(right);
            }
        }
        walk(&cell);
    }
}
