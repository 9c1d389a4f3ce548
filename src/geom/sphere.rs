//! Spherical geometry: celestial positions as unit 3-vectors.
//!
//! Positions are stored as points on the unit sphere and compared by chord
//! distance through the embedding, which increases monotonically with
//! angular separation and avoids trig in the hot loops.

use std::f64::consts::TAU;

use super::Position;

/// Convert (RA, Dec) in radians to a unit vector `[x, y, z]`.
pub fn radec_to_xyz(ra: f64, dec: f64) -> [f64; 3] {
    let cos_dec = dec.cos();
    [cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin()]
}

/// Convert a unit vector to (RA, Dec) in radians.
/// RA is in `[0, 2*pi)`, Dec is in `[-pi/2, pi/2]`.
pub fn xyz_to_radec(xyz: [f64; 3]) -> (f64, f64) {
    let mut ra = f64::atan2(xyz[1], xyz[0]);
    if ra < 0.0 {
        ra += TAU;
    }
    let dec = xyz[2].asin();
    (ra, dec)
}

/// Squared chord distance corresponding to an angular separation (radians).
pub fn chord_sq_from_angle(theta: f64) -> f64 {
    2.0 * (1.0 - theta.cos())
}

/// Angular units accepted for (RA, Dec) catalog columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleUnit {
    Radians,
    /// Hours of right ascension: 1h = 15 degrees.
    Hours,
    Degrees,
    Arcmin,
    Arcsec,
}

impl AngleUnit {
    /// Convert a value in this unit to radians.
    pub fn to_radians(self, value: f64) -> f64 {
        match self {
            AngleUnit::Radians => value,
            AngleUnit::Hours => (value * 15.0).to_radians(),
            AngleUnit::Degrees => value.to_radians(),
            AngleUnit::Arcmin => (value / 60.0).to_radians(),
            AngleUnit::Arcsec => (value / 3600.0).to_radians(),
        }
    }
}

/// A position on the celestial sphere: a unit vector `[x, y, z]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpherePoint(pub [f64; 3]);

impl SpherePoint {
    /// Construct from (RA, Dec) in radians.
    pub fn from_radec(ra: f64, dec: f64) -> Self {
        SpherePoint(radec_to_xyz(ra, dec))
    }

    /// Construct from (RA, Dec) with explicit per-axis units.
    pub fn from_radec_in(ra: f64, ra_unit: AngleUnit, dec: f64, dec_unit: AngleUnit) -> Self {
        Self::from_radec(ra_unit.to_radians(ra), dec_unit.to_radians(dec))
    }

    /// (RA, Dec) in radians. RA in `[0, 2*pi)`, Dec in `[-pi/2, pi/2]`.
    pub fn to_radec(&self) -> (f64, f64) {
        xyz_to_radec(self.0)
    }
}

impl Position for SpherePoint {
    const NDIM: usize = 3;
    type Sum = [f64; 3];

    fn from_coords(c1: f64, c2: f64) -> Self {
        Self::from_radec(c1, c2)
    }

    #[inline]
    fn coord(&self, axis: usize) -> f64 {
        self.0[axis]
    }

    #[inline]
    fn dist_sq(&self, other: &Self) -> f64 {
        let dx = self.0[0] - other.0[0];
        let dy = self.0[1] - other.0[1];
        let dz = self.0[2] - other.0[2];
        dx * dx + dy * dy + dz * dz
    }

    #[inline]
    fn accumulate(sum: &mut Self::Sum, p: &Self, w: f64) {
        sum[0] += w * p.0[0];
        sum[1] += w * p.0[1];
        sum[2] += w * p.0[2];
    }

    fn centroid(sum: &Self::Sum, _total_weight: f64) -> Self {
        let norm = (sum[0] * sum[0] + sum[1] * sum[1] + sum[2] * sum[2]).sqrt();
        if norm == 0.0 {
            // Zero-weight rows are filtered upstream; only an exactly
            // cancelling (e.g. antipodal) sum lands here.
            return SpherePoint([1.0, 0.0, 0.0]);
        }
        let inv = 1.0 / norm;
        SpherePoint([sum[0] * inv, sum[1] * inv, sum[2] * inv])
    }
}
