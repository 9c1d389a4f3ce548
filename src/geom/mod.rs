//! Point geometries: flat-sky Cartesian coordinates and the unit sphere.

pub mod flat;
pub mod sphere;

pub use flat::FlatPoint;
pub use sphere::{AngleUnit, SpherePoint};

/// A catalog position in one of the two supported geometries.
///
/// All distances are squared Euclidean distances in the embedding space:
/// the plane itself for flat-sky points, chord distance through the unit
/// ball for spherical points. Chord distance is monotonic in angular
/// separation, so threshold comparisons carry over unchanged.
pub trait Position: Copy + Send + Sync + 'static {
    /// Number of Cartesian axes in the embedding space.
    const NDIM: usize;

    /// Running weighted component sums, used to build centroids.
    type Sum: Copy + Default;

    /// Construct from the two catalog coordinate columns:
    /// (x, y) for the plane, (ra, dec) in radians for the sphere.
    fn from_coords(c1: f64, c2: f64) -> Self;

    /// Coordinate along the given embedding axis.
    fn coord(&self, axis: usize) -> f64;

    /// Squared Euclidean distance to another point.
    fn dist_sq(&self, other: &Self) -> f64;

    /// Add `w * self` into a running component sum.
    fn accumulate(sum: &mut Self::Sum, p: &Self, w: f64);

    /// Finish a component sum into a centroid position.
    ///
    /// Flat: componentwise division by the total weight. Sphere: the sum
    /// vector renormalized to unit length.
    fn centroid(sum: &Self::Sum, total_weight: f64) -> Self;
}
