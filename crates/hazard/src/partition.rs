//! Weighted source partitioning
//!
//! Groups sources by tectonic region type and splits every group into
//! blocks whose summed weight approximates `total_weight / hint`, so the
//! parallel block tasks are load-balanced. Deterministic for a given input
//! ordering, which keeps runs reproducible.

use indexmap::IndexMap;
use tracing::debug;

use crate::types::{Source, TrtId};

/// A block of sources homogeneous in tectonic region type
#[derive(Debug, Clone)]
pub struct SourceBlock {
    pub trt: TrtId,
    pub sources: Vec<Source>,
}

impl SourceBlock {
    /// Summed weight of the block
    pub fn weight(&self) -> f64 {
        self.sources.iter().map(|s| s.weight).sum()
    }
}

/// Split sources into TRT-homogeneous blocks of roughly equal weight
///
/// `hint` is the target number of concurrent tasks; every source ends up in
/// exactly one block. Greedy first-fit binning: a block is closed as soon
/// as adding the next source would push it past `total_weight / hint`.
pub fn split_in_blocks(sources: &[Source], hint: usize) -> Vec<SourceBlock> {
    let hint = hint.max(1);
    let total_weight: f64 = sources.iter().map(|s| s.weight).sum();
    let max_weight = (total_weight / hint as f64).ceil().max(1.0);

    let mut by_trt: IndexMap<TrtId, Vec<&Source>> = IndexMap::new();
    for source in sources {
        by_trt.entry(source.trt.clone()).or_default().push(source);
    }

    let mut blocks = Vec::new();
    for (trt, group) in by_trt {
        let mut block: Vec<Source> = Vec::new();
        let mut weight = 0.0;
        for source in group {
            if weight + source.weight > max_weight && !block.is_empty() {
                blocks.push(SourceBlock {
                    trt: trt.clone(),
                    sources: std::mem::take(&mut block),
                });
                weight = 0.0;
            }
            weight += source.weight;
            block.push(source.clone());
        }
        if !block.is_empty() {
            blocks.push(SourceBlock { trt, sources: block });
        }
    }
    debug!(
        sources = sources.len(),
        blocks = blocks.len(),
        max_weight,
        "sources partitioned"
    );
    blocks
}
