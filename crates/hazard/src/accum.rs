//! Aggregation of partial results
//!
//! Block tasks return a [`PartialResult`]; a single reducer folds them into
//! one [`Accumulator`] per (sub)calculation. The fold must give the same
//! answer for any arrival order, which holds because curve merging uses the
//! union-of-probabilities rule, elapsed-time records concatenate and
//! bounding boxes merge through `update_bb` — all commutative and
//! associative.

use indexmap::{IndexMap, IndexSet};

use crate::bbox::BoundingBox;
use crate::curves::{agg_curves_in_place, zero_curves, CurveMatrix};
use crate::error::{Error, Result};
use crate::logictree::RlzAssoc;
use crate::types::{GsimId, Imtls, SiteId, SourceId, TrtId};

/// Elapsed compute time of one source, for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTiming {
    pub trt: TrtId,
    pub source: SourceId,
    pub seconds: f64,
}

/// Output of one block task
///
/// Curve arrays are restricted to the sites actually affected; unaffected
/// sites carry zero probability. Bounding boxes are present only when the
/// calculation requested disaggregation output.
#[derive(Debug, Clone, Default)]
pub struct PartialResult {
    pub curves: IndexMap<(TrtId, GsimId), CurveMatrix>,
    pub calc_times: Vec<SourceTiming>,
    pub bboxes: Vec<BoundingBox>,
}

/// Running reduction state of one (sub)calculation
///
/// Created once with zero curves for every association key, folded over all
/// partial results by the reducer, then converted into per-realization
/// curves. Curve shapes are pinned to (sites, total levels) of the current
/// site collection; a partial result of any other shape is a programming
/// error and aborts the calculation.
#[derive(Debug, Clone)]
pub struct Accumulator {
    shape: (usize, usize),
    curves: IndexMap<(TrtId, GsimId), CurveMatrix>,
    touched: IndexSet<(TrtId, GsimId)>,
    calc_times: Vec<SourceTiming>,
    bb_map: IndexMap<(usize, SiteId), BoundingBox>,
}

impl Accumulator {
    /// Zero-curve accumulator for all keys of the association
    pub fn new(assoc: &RlzAssoc, n_sites: usize, imtls: &Imtls) -> Self {
        let curves = assoc
            .keys()
            .map(|key| (key.clone(), zero_curves(n_sites, imtls)))
            .collect();
        Self {
            shape: (n_sites, imtls.total_levels()),
            curves,
            touched: IndexSet::new(),
            calc_times: Vec::new(),
            bb_map: IndexMap::new(),
        }
    }

    /// Fold one partial result in
    pub fn merge(&mut self, partial: PartialResult) -> Result<()> {
        for ((trt, gsim), curves) in partial.curves {
            if curves.dim() != self.shape {
                return Err(Error::ShapeMismatch {
                    trt,
                    gsim,
                    expected: self.shape,
                    actual: curves.dim(),
                });
            }
            let acc = self
                .curves
                .entry((trt.clone(), gsim.clone()))
                .or_insert_with(|| CurveMatrix::zeros(self.shape));
            agg_curves_in_place(acc, &curves);
            self.touched.insert((trt, gsim));
        }
        self.calc_times.extend(partial.calc_times);
        for bb in &partial.bboxes {
            if bb.is_empty() {
                continue;
            }
            self.bb_map
                .entry((bb.sm_ordinal, bb.site_id))
                .or_insert_with(|| BoundingBox::new(bb.sm_ordinal, bb.site_id))
                .update_bb(bb)?;
        }
        Ok(())
    }

    /// Write a tile accumulator into this one at the tile's site positions
    ///
    /// Tiles cover disjoint site ranges, so rows are assigned rather than
    /// combined.
    pub fn scatter(&mut self, position: usize, tile: Accumulator) -> Result<()> {
        let (tile_sites, levels) = tile.shape;
        if levels != self.shape.1 || position + tile_sites > self.shape.0 {
            return Err(Error::InvalidParameter {
                name: "position",
                message: format!(
                    "tile of shape {:?} at row {position} does not fit in {:?}",
                    tile.shape, self.shape
                ),
            });
        }
        for (key, curves) in tile.curves {
            let acc = self
                .curves
                .entry(key.clone())
                .or_insert_with(|| CurveMatrix::zeros(self.shape));
            acc.slice_mut(ndarray::s![position..position + tile_sites, ..])
                .assign(&curves);
        }
        self.touched.extend(tile.touched);
        self.calc_times.extend(tile.calc_times);
        for (key, bb) in tile.bb_map {
            self.bb_map
                .entry(key)
                .or_insert_with(|| BoundingBox::new(key.0, key.1))
                .update_bb(&bb)?;
        }
        Ok(())
    }

    /// Curve shape (sites, total levels)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Per-(TRT, GSIM) curves
    pub fn curves(&self) -> &IndexMap<(TrtId, GsimId), CurveMatrix> {
        &self.curves
    }

    /// Keys that actually received a partial result
    pub fn is_effective(&self, trt: &TrtId) -> bool {
        self.touched.iter().any(|(t, _)| t == trt)
    }

    /// Per-source timings, unsorted
    pub fn calc_times(&self) -> &[SourceTiming] {
        &self.calc_times
    }

    /// Bounding boxes keyed by (source-model ordinal, site id)
    pub fn bb_map(&self) -> &IndexMap<(usize, SiteId), BoundingBox> {
        &self.bb_map
    }

    pub fn into_parts(
        self,
    ) -> (
        IndexMap<(TrtId, GsimId), CurveMatrix>,
        Vec<SourceTiming>,
        IndexMap<(usize, SiteId), BoundingBox>,
    ) {
        (self.curves, self.calc_times, self.bb_map)
    }
}
