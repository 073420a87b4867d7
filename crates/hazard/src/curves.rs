//! Hazard curve arrays and their combination rule
//!
//! A curve matrix holds one exceedance probability per (site, level), with
//! the level axis flattened across all intensity measure types as laid out
//! by [`Imtls`]. Partial results computed from disjoint source sets combine
//! with the independent-event union rule, which is commutative, associative
//! and has the all-zero matrix as identity; the whole distributed reduction
//! relies on exactly those properties.

use ndarray::{Array2, Array3, Zip};

use crate::types::Imtls;

/// Exceedance probabilities of shape (sites, total levels)
pub type CurveMatrix = Array2<f64>;

/// All-zero curves ("no exceedance") for the given collection size
pub fn zero_curves(n_sites: usize, imtls: &Imtls) -> CurveMatrix {
    Array2::zeros((n_sites, imtls.total_levels()))
}

/// All-zero hazard maps of shape (sites, imts, poes)
pub fn zero_maps(n_sites: usize, imtls: &Imtls, n_poes: usize) -> Array3<f64> {
    Array3::zeros((n_sites, imtls.len(), n_poes))
}

/// Union of exceedance probabilities of independent source sets:
/// `1 - (1 - a) * (1 - b)`, element-wise
pub fn agg_curves(a: &CurveMatrix, b: &CurveMatrix) -> CurveMatrix {
    let mut out = a.clone();
    agg_curves_in_place(&mut out, b);
    out
}

/// In-place form of [`agg_curves`], folding `b` into `acc`
pub fn agg_curves_in_place(acc: &mut CurveMatrix, b: &CurveMatrix) {
    Zip::from(acc).and(b).for_each(|a, &b| {
        *a = 1.0 - (1.0 - *a) * (1.0 - b);
    });
}
