//! Field construction: from columnar catalog input to a forest of cell
//! trees.
//!
//! Construction runs in two phases. A sequential pre-pass partitions the
//! point run until every tentative root is small enough to be useful to
//! the correlation pass (its extent is at most `max_sep * b`). The
//! subtrees below those roots cover disjoint runs, so they are then built
//! in parallel.

use log::{debug, warn};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;
use rayon::prelude::*;

use crate::cell::Cell;
use crate::celldata::{CellData, Count, Payload, Scalar, Shear, bounding_size_sq};
use crate::error::{FieldError, Result};
use crate::geom::{FlatPoint, Position, SpherePoint};
use crate::split::{SplitMethod, split_points};

/// Borrowed columnar catalog input.
///
/// `coord1` and `coord2` are (x, y) on the flat sky or (RA, Dec) in
/// radians on the sphere. Payload columns a field kind does not use may be
/// left `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Catalog<'a> {
    pub coord1: &'a [f64],
    pub coord2: &'a [f64],
    pub g1: Option<&'a [f64]>,
    pub g2: Option<&'a [f64]>,
    pub k: Option<&'a [f64]>,
    pub w: &'a [f64],
}

impl<'a> Catalog<'a> {
    /// Positions and weights only.
    pub fn counts(coord1: &'a [f64], coord2: &'a [f64], w: &'a [f64]) -> Self {
        Catalog {
            coord1,
            coord2,
            w,
            ..Catalog::default()
        }
    }

    /// Positions, two shear components, and weights.
    pub fn shear(
        coord1: &'a [f64],
        coord2: &'a [f64],
        g1: &'a [f64],
        g2: &'a [f64],
        w: &'a [f64],
    ) -> Self {
        Catalog {
            coord1,
            coord2,
            g1: Some(g1),
            g2: Some(g2),
            w,
            ..Catalog::default()
        }
    }

    /// Positions, a scalar field column, and weights.
    pub fn scalar(coord1: &'a [f64], coord2: &'a [f64], k: &'a [f64], w: &'a [f64]) -> Self {
        Catalog {
            coord1,
            coord2,
            k: Some(k),
            w,
            ..Catalog::default()
        }
    }
}

/// Parameters controlling how finely the tree resolves the catalog.
#[derive(Clone, Copy, Debug)]
pub struct FieldConfig {
    /// Smallest pair separation the correlation pass will request, in the
    /// same units as the coordinates.
    pub min_sep: f64,
    /// Largest pair separation of interest.
    pub max_sep: f64,
    /// Opening-angle resolution parameter, dimensionless, expected in
    /// `[0, 1]`. Zero disables aggregation entirely (brute-force mode).
    pub b: f64,
    /// Partitioning policy for recursive splits.
    pub split: SplitMethod,
    /// Seed for the Random split policy.
    pub seed: u64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            min_sep: 1.0,
            max_sep: 100.0,
            b: 0.1,
            split: SplitMethod::default(),
            seed: 0,
        }
    }
}

/// A tentative root accepted by the top-level pre-pass: finished summary,
/// extent, and the run of points `[start, end)` it covers.
struct TopCell<P: Position, K: Payload> {
    data: CellData<P, K>,
    sizesq: f64,
    start: usize,
    end: usize,
}

/// A forest of cell trees over one catalog.
///
/// The field owns every cell; dropping it drops the whole forest. After
/// construction the forest is immutable and safe to walk from many threads
/// at once.
#[derive(Debug)]
pub struct Field<P: Position, K: Payload> {
    roots: Vec<Cell<P, K>>,
    n_points: usize,
    total_weight: f64,
}

pub type ShearFieldFlat = Field<FlatPoint, Shear>;
pub type ShearFieldSphere = Field<SpherePoint, Shear>;
pub type ScalarFieldFlat = Field<FlatPoint, Scalar>;
pub type ScalarFieldSphere = Field<SpherePoint, Scalar>;
pub type CountFieldFlat = Field<FlatPoint, Count>;
pub type CountFieldSphere = Field<SpherePoint, Count>;

impl<P: Position, K: Payload> Field<P, K> {
    /// Build the forest for `catalog`.
    ///
    /// Rows with zero weight are dropped. With `max_sep * b == 0` every
    /// retained row becomes its own single-point root (brute-force mode).
    pub fn new(catalog: &Catalog<'_>, config: &FieldConfig) -> Result<Self> {
        validate_config(config)?;
        let n = catalog.coord1.len();
        check_len("coord2", catalog.coord2.len(), n)?;
        check_len("w", catalog.w.len(), n)?;

        let (g1, g2) = if K::NEEDS_SHEAR {
            (
                required_column("g1", catalog.g1, n)?,
                required_column("g2", catalog.g2, n)?,
            )
        } else {
            (&[][..], &[][..])
        };
        let k = if K::NEEDS_SCALAR {
            required_column("k", catalog.k, n)?
        } else {
            &[][..]
        };

        let mut points: Vec<CellData<P, K>> = Vec::with_capacity(n);
        let mut total_weight = 0.0;
        for i in 0..n {
            let w = catalog.w[i];
            if w == 0.0 {
                continue;
            }
            let g1i = if K::NEEDS_SHEAR { g1[i] } else { 0.0 };
            let g2i = if K::NEEDS_SHEAR { g2[i] } else { 0.0 };
            let ki = if K::NEEDS_SCALAR { k[i] } else { 0.0 };
            points.push(CellData::single(
                P::from_coords(catalog.coord1[i], catalog.coord2[i]),
                K::from_row(g1i, g2i, ki, w),
                w,
            ));
            total_weight += w;
        }
        debug!("field input: {} rows, {} retained", n, points.len());

        if points.is_empty() {
            warn!("all input weights are zero; field has no top-level cells");
            return Ok(Field {
                roots: Vec::new(),
                n_points: 0,
                total_weight: 0.0,
            });
        }

        // The smallest useful cell: two comparable neighbors (worst case
        // s2 = 2 s1) just fail the opening test at d = min_sep, giving
        // s = b * min_sep / (2 + 3b). No cell larger than b * max_sep can
        // ever fail the test at the largest separation of interest.
        let minsize = config.min_sep * config.b / (2.0 + 3.0 * config.b);
        let minsizesq = minsize * minsize;
        let maxsize = config.max_sep * config.b;
        let maxsizesq = maxsize * maxsize;
        debug!("minsizesq = {minsizesq:.6e}, maxsizesq = {maxsizesq:.6e}");

        let n_points = points.len();
        let roots = if maxsizesq == 0.0 {
            debug!("brute-force mode: every point is its own root");
            points.into_par_iter().map(Cell::leaf).collect()
        } else {
            let mut tops = Vec::new();
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
            setup_top_level(&mut points, maxsizesq, config.split, &mut rng, 0, &mut tops);
            debug!("{} top-level cells", tops.len());

            // Carve the point run into the disjoint per-root slices the
            // pre-pass established, then build each subtree in parallel.
            // Each task reseeds from its root index, so the forest is
            // reproducible under any thread schedule.
            let mut tasks: Vec<(TopCell<P, K>, &mut [CellData<P, K>])> =
                Vec::with_capacity(tops.len());
            let mut rest = points.as_mut_slice();
            for top in tops {
                let len = top.end - top.start;
                let (run, tail) = std::mem::take(&mut rest).split_at_mut(len);
                rest = tail;
                tasks.push((top, run));
            }
            debug_assert!(rest.is_empty());

            let seed = config.seed;
            let split = config.split;
            tasks
                .into_par_iter()
                .enumerate()
                .map(|(i, (top, run))| {
                    let mut rng =
                        Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(1 + i as u64));
                    Cell::build(top.data, top.sizesq, run, minsizesq, split, &mut rng)
                })
                .collect()
        };

        Ok(Field {
            roots,
            n_points,
            total_weight,
        })
    }

    /// The top-level cells of the forest.
    pub fn roots(&self) -> &[Cell<P, K>] {
        &self.roots
    }

    pub fn n_top_level(&self) -> usize {
        self.roots.len()
    }

    /// Number of catalog rows retained (nonzero weight).
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Sum of the retained weights.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

/// Sequential pre-pass: partition `points` until each tentative root has
/// `sizesq <= maxsizesq`, appending accepted roots to `out`. `base` is the
/// absolute index of `points[0]` in the full run.
///
/// Summaries rejected here are dropped without paying for their payload
/// sums; only accepted roots are finished.
fn setup_top_level<P: Position, K: Payload>(
    points: &mut [CellData<P, K>],
    maxsizesq: f64,
    method: SplitMethod,
    rng: &mut Xoshiro256PlusPlus,
    base: usize,
    out: &mut Vec<TopCell<P, K>>,
) {
    if points.len() == 1 {
        out.push(TopCell {
            data: points[0],
            sizesq: 0.0,
            start: base,
            end: base + 1,
        });
        return;
    }

    let mut summary = CellData::summarize(points);
    let sizesq = bounding_size_sq(summary.pos(), points);

    if sizesq <= maxsizesq {
        summary.finish_payload(points);
        out.push(TopCell {
            data: summary,
            sizesq,
            start: base,
            end: base + points.len(),
        });
    } else {
        let mid = split_points(points, method, rng);
        let (left, right) = points.split_at_mut(mid);
        setup_top_level(left, maxsizesq, method, rng, base, out);
        setup_top_level(right, maxsizesq, method, rng, base + mid, out);
    }
}

fn validate_config(config: &FieldConfig) -> Result<()> {
    if config.min_sep < 0.0 || config.max_sep < config.min_sep {
        return Err(FieldError::SeparationRange {
            min_sep: config.min_sep,
            max_sep: config.max_sep,
        });
    }
    if config.b < 0.0 {
        return Err(FieldError::OpeningAngle(config.b));
    }
    Ok(())
}

fn check_len(column: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(FieldError::ColumnLength {
            column,
            expected,
            actual,
        });
    }
    Ok(())
}

fn required_column<'a>(
    name: &'static str,
    column: Option<&'a [f64]>,
    n: usize,
) -> Result<&'a [f64]> {
    let col = column.ok_or(FieldError::MissingColumn(name))?;
    check_len(name, col.len(), n)?;
    Ok(col)
}
