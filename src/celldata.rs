//! Leaf aggregates: weighted centroid, total weight, and payload sums.
//!
//! A `CellData` describes either a single catalog point or the aggregate of
//! a contiguous run of points. Payloads are raw weighted sums, never means;
//! the correlation pass divides by the total weight where it needs to.

use num_complex::Complex64;

use crate::geom::Position;

/// The payload carried by each catalog point, determined by what the
/// catalog measures at that point.
pub trait Payload: Copy + Send + Sync + 'static {
    /// Whether the (g1, g2) shear columns must be present at ingestion.
    const NEEDS_SHEAR: bool;
    /// Whether the scalar column must be present at ingestion.
    const NEEDS_SCALAR: bool;

    fn zero() -> Self;

    /// Fold another payload sum into this one.
    fn add(&mut self, other: &Self);

    /// Weighted payload for a single input row. Columns a kind does not
    /// use are ignored.
    fn from_row(g1: f64, g2: f64, k: f64, w: f64) -> Self;
}

/// Spin-2 shear payload: the complex sum `sum_i w_i (g1_i + i g2_i)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shear(pub Complex64);

impl Payload for Shear {
    const NEEDS_SHEAR: bool = true;
    const NEEDS_SCALAR: bool = false;

    fn zero() -> Self {
        Shear(Complex64::new(0.0, 0.0))
    }

    #[inline]
    fn add(&mut self, other: &Self) {
        self.0 += other.0;
    }

    #[inline]
    fn from_row(g1: f64, g2: f64, _k: f64, w: f64) -> Self {
        Shear(Complex64::new(w * g1, w * g2))
    }
}

/// Scalar field payload: the weighted sum `sum_i w_i k_i`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scalar(pub f64);

impl Payload for Scalar {
    const NEEDS_SHEAR: bool = false;
    const NEEDS_SCALAR: bool = true;

    fn zero() -> Self {
        Scalar(0.0)
    }

    #[inline]
    fn add(&mut self, other: &Self) {
        self.0 += other.0;
    }

    #[inline]
    fn from_row(_g1: f64, _g2: f64, k: f64, w: f64) -> Self {
        Scalar(w * k)
    }
}

/// Pure count payload: nothing beyond the weight itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Count;

impl Payload for Count {
    const NEEDS_SHEAR: bool = false;
    const NEEDS_SCALAR: bool = false;

    fn zero() -> Self {
        Count
    }

    #[inline]
    fn add(&mut self, _other: &Self) {}

    #[inline]
    fn from_row(_g1: f64, _g2: f64, _k: f64, _w: f64) -> Self {
        Count
    }
}

/// Summary of one catalog point or of a contiguous run of points:
/// weighted centroid, total weight, payload sum.
///
/// Aggregates are built in two phases. [`CellData::summarize`] computes the
/// centroid and total weight, which is all the partitioner and the size
/// bound need; [`CellData::finish_payload`] fills in the payload sum and
/// runs only once a node is known to be retained in the tree.
#[derive(Clone, Copy, Debug)]
pub struct CellData<P: Position, K: Payload> {
    pos: P,
    w: f64,
    payload: K,
}

impl<P: Position, K: Payload> CellData<P, K> {
    /// Complete record of a single catalog point.
    pub fn single(pos: P, payload: K, w: f64) -> Self {
        CellData { pos, w, payload }
    }

    /// Centroid-and-weight summary of `points`. The payload is left at
    /// zero until [`CellData::finish_payload`].
    pub fn summarize(points: &[Self]) -> Self {
        let mut sum = P::Sum::default();
        let mut w = 0.0;
        for p in points {
            P::accumulate(&mut sum, &p.pos, p.w);
            w += p.w;
        }
        CellData {
            pos: P::centroid(&sum, w),
            w,
            payload: K::zero(),
        }
    }

    /// Fill in the payload sum over `points`.
    pub fn finish_payload(&mut self, points: &[Self]) {
        let mut payload = K::zero();
        for p in points {
            payload.add(&p.payload);
        }
        self.payload = payload;
    }

    pub fn pos(&self) -> &P {
        &self.pos
    }

    pub fn weight(&self) -> f64 {
        self.w
    }

    pub fn payload(&self) -> &K {
        &self.payload
    }
}

/// Squared bounding extent: the largest squared distance from `center` to
/// any of `points`.
pub fn bounding_size_sq<P: Position, K: Payload>(center: &P, points: &[CellData<P, K>]) -> f64 {
    let mut max = 0.0;
    for p in points {
        let d = center.dist_sq(&p.pos);
        if d > max {
            max = d;
        }
    }
    max
}
