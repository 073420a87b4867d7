//! Logic-tree realization association
//!
//! Maps each (tectonic region type, GSIM) pair to the logic-tree
//! realizations it contributes to. Built once per calculation from the
//! source-model logic tree and read-only afterwards; the tiling pipeline
//! rebuilds a pruned copy per tile to bound memory.

use indexmap::IndexMap;
use tracing::debug;

use crate::curves::{agg_curves_in_place, zero_curves, CurveMatrix};
use crate::types::{GsimId, Imtls, TrtId};

/// One fully specified logic-tree path
#[derive(Debug, Clone, PartialEq)]
pub struct Realization {
    pub ordinal: usize,
    /// Relative weight from logic-tree enumeration; uniform weights are
    /// used instead when the tree was sampled
    pub weight: f64,
}

/// Association between (TRT, GSIM) keys and logic-tree realizations
#[derive(Debug, Clone, Default)]
pub struct RlzAssoc {
    realizations: Vec<Realization>,
    gsims_by_trt: IndexMap<TrtId, Vec<GsimId>>,
    rlzs_by_key: IndexMap<(TrtId, GsimId), Vec<usize>>,
    sm_by_trt: IndexMap<TrtId, usize>,
    /// 0 means the logic tree was fully enumerated
    number_of_samples: usize,
}

impl RlzAssoc {
    pub fn new(realizations: Vec<Realization>, number_of_samples: usize) -> Self {
        Self {
            realizations,
            number_of_samples,
            ..Default::default()
        }
    }

    /// Associate a (TRT, GSIM) key, owned by the source model with the
    /// given ordinal, with the realizations it contributes to
    pub fn associate(
        &mut self,
        sm_ordinal: usize,
        trt: TrtId,
        gsim: GsimId,
        rlz_ordinals: &[usize],
    ) {
        self.gsims_by_trt
            .entry(trt.clone())
            .or_default()
            .push(gsim.clone());
        self.sm_by_trt.insert(trt.clone(), sm_ordinal);
        self.rlzs_by_key
            .insert((trt, gsim), rlz_ordinals.to_vec());
    }

    /// All (TRT, GSIM) keys, in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &(TrtId, GsimId)> {
        self.rlzs_by_key.keys()
    }

    /// GSIMs to evaluate for one tectonic region type
    pub fn gsims_for(&self, trt: &TrtId) -> Option<&[GsimId]> {
        self.gsims_by_trt.get(trt).map(Vec::as_slice)
    }

    /// Ordinal of the source model owning a tectonic region type
    pub fn sm_ordinal(&self, trt: &TrtId) -> Option<usize> {
        self.sm_by_trt.get(trt).copied()
    }

    pub fn realizations(&self) -> &[Realization] {
        &self.realizations
    }

    /// Statistics weights: the realization weights under enumeration,
    /// `None` (uniform) when the logic tree was sampled
    pub fn weights(&self) -> Option<Vec<f64>> {
        if self.number_of_samples > 0 {
            None
        } else {
            Some(self.realizations.iter().map(|r| r.weight).collect())
        }
    }

    /// Combine per-(TRT, GSIM) curves into per-realization curves
    ///
    /// A realization's full hazard curve is the union of the curves of
    /// every key assigned to it; keys with no curves are skipped as "no
    /// contribution".
    pub fn combine_curves(
        &self,
        curves_by_key: &IndexMap<(TrtId, GsimId), CurveMatrix>,
        n_sites: usize,
        imtls: &Imtls,
    ) -> Vec<CurveMatrix> {
        let mut by_rlz: Vec<CurveMatrix> = (0..self.realizations.len())
            .map(|_| zero_curves(n_sites, imtls))
            .collect();
        for (key, rlzs) in &self.rlzs_by_key {
            let Some(curves) = curves_by_key.get(key) else {
                continue;
            };
            for &ordinal in rlzs {
                agg_curves_in_place(&mut by_rlz[ordinal], curves);
            }
        }
        by_rlz
    }

    /// Copy of this association restricted to effective tectonic region
    /// types
    pub fn pruned<F: Fn(&TrtId) -> bool>(&self, effective: F) -> Self {
        let mut pruned = Self::new(self.realizations.clone(), self.number_of_samples);
        for ((trt, gsim), rlzs) in &self.rlzs_by_key {
            if effective(trt) {
                let sm = self.sm_by_trt[trt];
                pruned.associate(sm, trt.clone(), gsim.clone(), rlzs);
            }
        }
        debug!(
            keys = pruned.rlzs_by_key.len(),
            of = self.rlzs_by_key.len(),
            "association pruned"
        );
        pruned
    }

    /// Number of (TRT, GSIM) keys
    pub fn len(&self) -> usize {
        self.rlzs_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rlzs_by_key.is_empty()
    }
}
