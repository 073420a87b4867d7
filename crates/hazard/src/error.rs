//! Calculation errors

use thiserror::Error;

use crate::types::{GsimId, SourceId, TrtId};

/// Calculation result type
pub type Result<T> = std::result::Result<T, Error>;

/// Calculation errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("shape mismatch for ({trt}, {gsim}): expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        trt: TrtId,
        gsim: GsimId,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("empty source block")]
    EmptyBlock,

    #[error("no GSIMs associated with tectonic region type {0}")]
    UnknownTrt(TrtId),

    #[error("longitudes span more than 180 degrees")]
    WideLongitudinalExtent,

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("hazard kernel failed for source {source_id}: {message}")]
    Kernel { source_id: SourceId, message: String },
}
