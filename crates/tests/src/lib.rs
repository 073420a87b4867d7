//! Integration test harness for the seisma hazard pipeline.
//!
//! Provides a deterministic toy kernel with realistic monotone curves and
//! a scenario builder, so end-to-end tests can compare full pipeline runs
//! (classical vs tiled, different partitionings) without pulling in a real
//! rupture/attenuation engine.

use ndarray::Array2;

use seisma_hazard::accum::Accumulator;
use seisma_hazard::bbox::BoundingBox;
use seisma_hazard::curves::CurveMatrix;
use seisma_hazard::geo::geodetic_distance;
use seisma_hazard::logictree::{Realization, RlzAssoc};
use seisma_hazard::task::{HazardKernel, KernelInput};
use seisma_hazard::{
    CalcParams, ClassicalCalculator, HazardResult, Imt, Imtls, Result, SiteCollection, Source,
    TilingCalculator,
};

/// Deterministic stand-in for the physical hazard computation.
///
/// Exceedance probability decays exponentially with intensity level and
/// with source-site distance, and grows with source weight, so curves are
/// monotone in level (hazard maps are well defined) and every input
/// perturbs the output.
pub struct DecayKernel;

impl HazardKernel for DecayKernel {
    fn compute_curves(
        &self,
        input: &KernelInput<'_>,
        bbs: &mut [BoundingBox],
    ) -> Result<Vec<CurveMatrix>> {
        let n = input.sites.len();
        let total = input.imtls.total_levels();
        let mut per_gsim = Vec::with_capacity(input.gsims.len());
        for (g, _) in input.gsims.iter().enumerate() {
            let gsim_scale = 1.0 + 0.1 * g as f64;
            let mut curves = Array2::zeros((n, total));
            for (i, site) in input.sites.iter().enumerate() {
                let dist = geodetic_distance(input.source.lon, input.source.lat, site.lon, site.lat);
                let mut col = 0;
                for (_imt, levels, _range) in input.imtls.iter() {
                    for &level in levels {
                        let rate = input.source.weight * gsim_scale / 10.0;
                        let attenuation = (-level * 5.0 - dist / 150.0).exp();
                        curves[[i, col]] = 1.0 - (-rate * attenuation).exp();
                        col += 1;
                    }
                }
            }
            per_gsim.push(curves);
        }
        for (bb, site) in bbs.iter_mut().zip(input.sites.iter()) {
            let dist = geodetic_distance(input.source.lon, input.source.lat, site.lon, site.lat);
            bb.update(&[dist], &[input.source.lon], &[input.source.lat])?;
        }
        Ok(per_gsim)
    }
}

/// A complete, deterministic calculation setup.
pub struct Scenario {
    pub sources: Vec<Source>,
    pub sitecol: SiteCollection,
    pub assoc: RlzAssoc,
    pub params: CalcParams,
}

impl Scenario {
    /// Two-TRT, three-realization scenario over a small site grid.
    pub fn two_trt(n_sites: usize) -> Self {
        let sources = vec![
            source("alpha", "active shallow crust", 3.0, 0.0, 0.0),
            source("beta", "active shallow crust", 7.0, 0.3, 0.2),
            source("gamma", "stable continental", 5.0, 0.6, -0.2),
            source("delta", "stable continental", 2.0, 0.9, 0.1),
        ];
        let locations: Vec<(f64, f64)> = (0..n_sites)
            .map(|i| (0.05 * i as f64, 0.02 * (i % 7) as f64))
            .collect();
        let sitecol = SiteCollection::new(&locations);

        let mut assoc = RlzAssoc::new(
            vec![
                Realization { ordinal: 0, weight: 0.5 },
                Realization { ordinal: 1, weight: 0.3 },
                Realization { ordinal: 2, weight: 0.2 },
            ],
            0,
        );
        assoc.associate(0, "active shallow crust".into(), "GsimA".into(), &[0, 1]);
        assoc.associate(0, "active shallow crust".into(), "GsimB".into(), &[2]);
        assoc.associate(0, "stable continental".into(), "GsimC".into(), &[0, 2]);
        assoc.associate(0, "stable continental".into(), "GsimD".into(), &[1]);

        let mut imtls = Imtls::new();
        imtls.insert("PGA".into(), vec![0.05, 0.1, 0.2, 0.4]);
        imtls.insert(Imt::sa(0.2), vec![0.05, 0.1, 0.2, 0.4]);
        imtls.insert(Imt::sa(1.0), vec![0.02, 0.05, 0.1, 0.2]);

        let params = CalcParams {
            imtls,
            maximum_distance: 400.0,
            quantile_hazard_curves: vec![0.15, 0.85],
            poes: vec![0.1, 0.02],
            hazard_maps: true,
            uniform_hazard_spectra: true,
            ..Default::default()
        };
        Self {
            sources,
            sitecol,
            assoc,
            params,
        }
    }

    /// Run the non-tiled pipeline with the given task count.
    pub fn run_classical(&self, concurrent_tasks: usize) -> Result<HazardResult> {
        let params = CalcParams {
            concurrent_tasks,
            ..self.params.clone()
        };
        ClassicalCalculator::new(&self.sources, &self.sitecol, &self.assoc, &params, &DecayKernel)
            .run()
    }

    /// Run the tiled pipeline with the given tile-count hint.
    pub fn run_tiled(&self, tiles: usize) -> Result<HazardResult> {
        let params = CalcParams {
            concurrent_tasks: tiles,
            ..self.params.clone()
        };
        TilingCalculator::new(&self.sources, &self.sitecol, &self.assoc, &params, &DecayKernel)
            .run()
    }

    /// Run only the reduction stage, for accumulator-level assertions.
    pub fn execute_classical(&self, concurrent_tasks: usize) -> Result<Accumulator> {
        let params = CalcParams {
            concurrent_tasks,
            ..self.params.clone()
        };
        ClassicalCalculator::new(&self.sources, &self.sitecol, &self.assoc, &params, &DecayKernel)
            .execute()
    }
}

fn source(id: &str, trt: &str, weight: f64, lon: f64, lat: f64) -> Source {
    Source {
        id: id.into(),
        trt: trt.into(),
        weight,
        lon,
        lat,
    }
}
