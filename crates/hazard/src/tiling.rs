//! Tiling calculator
//!
//! Splits the site collection into contiguous tiles and runs the whole
//! block-task pipeline per tile, scattering each tile's curves back into a
//! full-size accumulator at the tile's original site positions. The
//! realization association can be memory-heavy at full-catalog scale;
//! rebuilding it per tile over the effective tectonic region types bounds
//! peak memory.

use rayon::prelude::*;
use tracing::{info, instrument};

use crate::accum::Accumulator;
use crate::calculator::{post_process, ClassicalCalculator, HazardResult};
use crate::error::Result;
use crate::logictree::RlzAssoc;
use crate::task::HazardKernel;
use crate::types::{CalcParams, SiteCollection, Source};

/// Classical calculator that processes the site collection tile by tile
pub struct TilingCalculator<'a, K: HazardKernel> {
    sources: &'a [Source],
    sitecol: &'a SiteCollection,
    assoc: &'a RlzAssoc,
    params: &'a CalcParams,
    kernel: &'a K,
}

impl<'a, K: HazardKernel> TilingCalculator<'a, K> {
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

    /// Run one sub-calculation per tile and reassemble the full-size
    /// accumulator
    ///
    /// Tiles are independent and run in parallel; the inner pipelines run
    /// sequentially so the parallel grain stays at tile level.
    #[instrument(skip(self), name = "classical_tiling")]
    pub fn execute(&self) -> Result<Accumulator> {
        let tiles = self.sitecol.split(self.params.concurrent_tasks.max(1));
        info!(tiles = tiles.len(), sites = self.sitecol.len(), "tiling calculation starting");

        // tile tasks keep the block-level pipeline sequential
        let tile_params = CalcParams {
            concurrent_tasks: 1,
            ..self.params.clone()
        };

        let tile_accs = tiles
            .par_iter()
            .enumerate()
            .map(|(tileno, tile)| {
                let calc = ClassicalCalculator::new(
                    self.sources,
                    &tile.sites,
                    self.assoc,
                    &tile_params,
                    self.kernel,
                );
                let acc = calc.execute()?;
                // rebuild the association over the TRTs this tile touched
                let pruned = self.assoc.pruned(|trt| acc.is_effective(trt));
                info!(
                    tileno,
                    sites = tile.sites.len(),
                    levels = self.params.imtls.total_levels(),
                    keys = pruned.len(),
                    rlzs = pruned.realizations().len(),
                    "processed tile"
                );
                Ok((tile.position, acc))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut full = Accumulator::new(self.assoc, self.sitecol.len(), &self.params.imtls);
        for (position, acc) in tile_accs {
            full.scatter(position, acc)?;
        }
        Ok(full)
    }

    /// Full pipeline: tiled execution plus the shared post-processing
    pub fn run(&self) -> Result<HazardResult> {
        let acc = self.execute()?;
        post_process(acc, self.assoc, self.params, self.sitecol.len())
    }
}
