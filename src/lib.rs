//! Hierarchical cell trees for two-point correlation of astronomical
//! catalogs.
//!
//! Shearwater groups catalog points, each carrying a position, a weight,
//! and a shear, scalar, or count payload, into a forest of binary cells
//! whose extents are bounded by the separation range and opening angle a
//! correlation pass will use. Construction is two-phase: a sequential
//! top-level partition followed by parallel subtree builds.

pub mod c_api;
pub mod cell;
pub mod celldata;
pub mod error;
pub mod field;
pub mod geom;
pub mod split;
