//! Classical PSHA calculator
//!
//! Orchestrates the pipeline: weighted partitioning, parallel block tasks,
//! sequential reduction into the accumulator, per-realization combination
//! and statistics. Workers never see the accumulator; only the reducer
//! mutates it, and the reduction algebra makes the result independent of
//! the order partial results arrive in.

use indexmap::IndexMap;
use ndarray::Array3;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::accum::{Accumulator, SourceTiming};
use crate::bbox::BoundingBox;
use crate::curves::CurveMatrix;
use crate::error::Result;
use crate::logictree::RlzAssoc;
use crate::partition::split_in_blocks;
use crate::stats::{
    compute_hazard_maps, make_uhs, mean_curve, quantile_curve, UniformHazardSpectra,
};
use crate::task::{classical_task, HazardKernel};
use crate::types::{CalcParams, SiteCollection, SiteId, Source};

/// Final output of a classical calculation
#[derive(Debug, Clone)]
pub struct HazardResult {
    /// Per-realization curves, kept only when `individual_curves` is set
    pub curves_by_rlz: Option<Vec<CurveMatrix>>,
    /// Weighted mean curves; with a single realization this is that
    /// realization's curves (statistics are undefined for one sample)
    pub mean_curves: Option<CurveMatrix>,
    /// Requested quantile curves, empty with a single realization
    pub quantile_curves: Vec<(f64, CurveMatrix)>,
    /// Hazard maps of shape (sites, imts, poes) from the mean curves
    pub hazard_maps: Option<Array3<f64>>,
    pub uhs: Option<UniformHazardSpectra>,
    /// Per-source timings sorted by descending cost
    pub source_info: Vec<SourceTiming>,
    /// Disaggregation bounding boxes, keyed by (source-model ordinal, site)
    pub bb_map: IndexMap<(usize, SiteId), BoundingBox>,
}

/// Classical PSHA calculator over one site collection
pub struct ClassicalCalculator<'a, K: HazardKernel> {
    sources: &'a [Source],
    sitecol: &'a SiteCollection,
    assoc: &'a RlzAssoc,
    params: &'a CalcParams,
    kernel: &'a K,
}

impl<'a, K: HazardKernel> ClassicalCalculator<'a, K> {
    pub fn new(
        sources: &'a [Source],
        sitecol: &'a SiteCollection,
        assoc: &'a RlzAssoc,
        params: &'a CalcParams,
        kernel: &'a K,
    ) -> Self {
        Self {
            sources,
            sitecol,
            assoc,
            params,
            kernel,
        }
    }

    /// Run block tasks over weighted source blocks and reduce their partial
    /// results into one accumulator
    ///
    /// Any task failure aborts the whole calculation; there is no
    /// partial-results-on-failure mode.
    #[instrument(skip(self), name = "classical")]
    pub fn execute(&self) -> Result<Accumulator> {
        let hint = self.params.concurrent_tasks.max(1);
        let blocks = split_in_blocks(self.sources, hint);
        info!(
            sources = self.sources.len(),
            blocks = blocks.len(),
            sites = self.sitecol.len(),
            "classical calculation starting"
        );

        let partials = if hint <= 1 {
            blocks
                .iter()
                .map(|block| {
                    classical_task(block, self.sitecol, self.assoc, self.params, self.kernel)
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            blocks
                .par_iter()
                .map(|block| {
                    classical_task(block, self.sitecol, self.assoc, self.params, self.kernel)
                })
                .collect::<Result<Vec<_>>>()?
        };

        // single-writer reduction; order does not matter by construction
        let mut acc = Accumulator::new(self.assoc, self.sitecol.len(), &self.params.imtls);
        for partial in partials {
            acc.merge(partial)?;
        }
        Ok(acc)
    }

    /// Full pipeline: execute, then derive realization curves, statistics
    /// and maps
    pub fn run(&self) -> Result<HazardResult> {
        let acc = self.execute()?;
        post_process(acc, self.assoc, self.params, self.sitecol.len())
    }
}

/// Turn an accumulator into the user-facing result
///
/// Shared by the classical and tiling calculators.
pub fn post_process(
    acc: Accumulator,
    assoc: &RlzAssoc,
    params: &CalcParams,
    n_sites: usize,
) -> Result<HazardResult> {
    let (curves_by_key, mut calc_times, bb_map) = acc.into_parts();
    calc_times.sort_by(|a, b| b.seconds.total_cmp(&a.seconds));

    let curves_by_rlz = assoc.combine_curves(&curves_by_key, n_sites, &params.imtls);
    let n_rlzs = curves_by_rlz.len();
    let weights = assoc.weights();

    let (mean_curves, quantile_curves) = if n_rlzs == 1 {
        // cannot compute statistics from one sample
        (Some(curves_by_rlz[0].clone()), Vec::new())
    } else {
        let mean = params
            .mean_hazard_curves
            .then(|| mean_curve(&curves_by_rlz, weights.as_deref()));
        let quantiles = params
            .quantile_hazard_curves
            .iter()
            .map(|&q| Ok((q, quantile_curve(&curves_by_rlz, q, weights.as_deref())?)))
            .collect::<Result<Vec<_>>>()?;
        (mean, quantiles)
    };

    let want_maps = params.hazard_maps || params.uniform_hazard_spectra;
    let (hazard_maps, uhs) = match (&mean_curves, want_maps && !params.poes.is_empty()) {
        (Some(curves), true) => {
            let maps = compute_hazard_maps(curves, &params.imtls, &params.poes);
            let uhs = params
                .uniform_hazard_spectra
                .then(|| make_uhs(&maps, &params.imtls, &params.poes))
                .flatten();
            (params.hazard_maps.then_some(maps), uhs)
        }
        _ => (None, None),
    };

    info!(
        rlzs = n_rlzs,
        quantiles = quantile_curves.len(),
        sources_timed = calc_times.len(),
        "calculation complete"
    );
    Ok(HazardResult {
        curves_by_rlz: params.individual_curves.then_some(curves_by_rlz),
        mean_curves,
        quantile_curves,
        hazard_maps,
        uhs,
        source_info: calc_times,
        bb_map,
    })
}
