//! Classical probabilistic seismic hazard calculation core
//!
//! Computes hazard curves per site and intensity measure type across a
//! logic tree of source models and ground-motion models: weighted source
//! partitioning, parallel block tasks, order-independent reduction of
//! partial results, per-realization combination with mean/quantile
//! statistics, hazard maps and uniform hazard spectra, plus the bounding
//! boxes feeding disaggregation. The physical rupture/attenuation
//! computation is consumed through the [`task::HazardKernel`] trait.

pub mod accum;
pub mod bbox;
pub mod calculator;
pub mod curves;
pub mod error;
pub mod geo;
pub mod logictree;
pub mod partition;
pub mod stats;
pub mod task;
pub mod tiling;
pub mod types;

pub use calculator::{ClassicalCalculator, HazardResult};
pub use error::{Error, Result};
pub use tiling::TilingCalculator;
pub use types::*;
