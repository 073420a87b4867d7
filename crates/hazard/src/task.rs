//! Block tasks
//!
//! A block task computes hazard curves for one TRT-homogeneous source block
//! against a site collection, for every GSIM assigned to that TRT. Tasks
//! only read shared inputs and return a private [`PartialResult`], so any
//! subset of them can run in any order or in parallel.

use std::time::Instant;

use tracing::trace;

use crate::accum::{PartialResult, SourceTiming};
use crate::bbox::BoundingBox;
use crate::curves::{zero_curves, CurveMatrix};
use crate::error::{Error, Result};
use crate::geo::geodetic_distance;
use crate::logictree::RlzAssoc;
use crate::partition::SourceBlock;
use crate::types::{CalcParams, GsimId, Imtls, SiteCollection, Source};

/// Input handed to the physical hazard computation for one source
pub struct KernelInput<'a> {
    pub source: &'a Source,
    /// Sites within `maximum_distance` of the source, original ids kept
    pub sites: &'a SiteCollection,
    pub imtls: &'a Imtls,
    pub gsims: &'a [GsimId],
    pub truncation_level: Option<f64>,
    pub maximum_distance: f64,
}

/// The opaque physical hazard computation
///
/// Given one source and the sites it can affect, returns one exceedance
/// curve matrix per GSIM, each of shape (input sites, total levels), and
/// optionally enlarges the per-site bounding boxes with the rupture
/// distances and locations it considered. Implementations must be pure:
/// same input, same output, no shared mutable state.
pub trait HazardKernel: Sync {
    fn compute_curves(
        &self,
        input: &KernelInput<'_>,
        bbs: &mut [BoundingBox],
    ) -> Result<Vec<CurveMatrix>>;
}

/// Compute the partial hazard curves of one source block
///
/// The source-site distance pre-filter drops sources with no site within
/// `maximum_distance` and hands each kernel call only the sites in range;
/// contributions beyond that distance are zero by the kernel contract, so
/// filtering changes cost, never the result. Per-source contributions for
/// the same site combine with the union rule, sources being independent.
pub fn classical_task<K: HazardKernel>(
    block: &SourceBlock,
    sites: &SiteCollection,
    assoc: &RlzAssoc,
    params: &CalcParams,
    kernel: &K,
) -> Result<PartialResult> {
    if block.sources.is_empty() {
        return Err(Error::EmptyBlock);
    }
    let trt = &block.trt;
    let gsims = assoc
        .gsims_for(trt)
        .ok_or_else(|| Error::UnknownTrt(trt.clone()))?;
    let sm_ordinal = assoc
        .sm_ordinal(trt)
        .ok_or_else(|| Error::UnknownTrt(trt.clone()))?;

    let n_sites = sites.len();
    let mut curves_by_gsim: Vec<CurveMatrix> = gsims
        .iter()
        .map(|_| zero_curves(n_sites, &params.imtls))
        .collect();
    let mut bboxes: Vec<BoundingBox> = if params.poes_disagg {
        sites
            .sids()
            .map(|sid| BoundingBox::new(sm_ordinal, sid))
            .collect()
    } else {
        Vec::new()
    };
    let mut calc_times = Vec::new();

    for source in &block.sources {
        let in_range: Vec<usize> = (0..n_sites)
            .filter(|&i| {
                let site = sites.get(i).expect("index in range");
                geodetic_distance(source.lon, source.lat, site.lon, site.lat)
                    <= params.maximum_distance
            })
            .collect();
        if in_range.is_empty() {
            trace!(source = %source.id, "source beyond maximum distance");
            continue;
        }
        let filtered = sites.filtered(&in_range);
        let mut filtered_bbs: Vec<BoundingBox> = if params.poes_disagg {
            filtered
                .sids()
                .map(|sid| BoundingBox::new(sm_ordinal, sid))
                .collect()
        } else {
            Vec::new()
        };

        let started = Instant::now();
        let input = KernelInput {
            source,
            sites: &filtered,
            imtls: &params.imtls,
            gsims,
            truncation_level: params.truncation_level,
            maximum_distance: params.maximum_distance,
        };
        let source_curves = kernel.compute_curves(&input, &mut filtered_bbs)?;
        calc_times.push(SourceTiming {
            trt: trt.clone(),
            source: source.id.clone(),
            seconds: started.elapsed().as_secs_f64(),
        });

        if source_curves.len() != gsims.len() {
            return Err(Error::Kernel {
                source_id: source.id.clone(),
                message: format!(
                    "returned {} curve sets for {} gsims",
                    source_curves.len(),
                    gsims.len()
                ),
            });
        }
        let expected = (filtered.len(), params.imtls.total_levels());
        for (gsim, curves) in gsims.iter().zip(&source_curves) {
            if curves.dim() != expected {
                return Err(Error::ShapeMismatch {
                    trt: trt.clone(),
                    gsim: gsim.clone(),
                    expected,
                    actual: curves.dim(),
                });
            }
        }
        // scatter in-range rows back into the block-wide arrays, unioning
        // with what other sources already contributed to the same site
        for (acc, curves) in curves_by_gsim.iter_mut().zip(&source_curves) {
            for (k, &row) in in_range.iter().enumerate() {
                let mut target = acc.row_mut(row);
                for (a, &b) in target.iter_mut().zip(curves.row(k).iter()) {
                    *a = 1.0 - (1.0 - *a) * (1.0 - b);
                }
            }
        }
        if params.poes_disagg {
            for (k, &row) in in_range.iter().enumerate() {
                bboxes[row].update_bb(&filtered_bbs[k])?;
            }
        }
    }

    let curves = gsims
        .iter()
        .cloned()
        .zip(curves_by_gsim)
        .map(|(gsim, curves)| ((trt.clone(), gsim), curves))
        .collect();
    Ok(PartialResult {
        curves,
        calc_times,
        bboxes,
    })
}
