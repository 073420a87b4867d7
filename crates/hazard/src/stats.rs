//! Statistics over realization curves
//!
//! Weighted mean and quantile curves across logic-tree realizations, plus
//! the derived products: hazard maps (intensity level at a target
//! probability of exceedance) and uniform hazard spectra (hazard maps
//! reshaped across spectral periods).

use ndarray::{Array2, Array3};

use crate::curves::{zero_maps, CurveMatrix};
use crate::error::{Error, Result};
use crate::types::Imtls;

/// Uniform hazard spectra: for each site and target poe, the hazard-map
/// value at every spectral period, periods ascending (PGA as period 0)
#[derive(Debug, Clone, PartialEq)]
pub struct UniformHazardSpectra {
    pub periods: Vec<f64>,
    /// Shape (sites, poes, periods)
    pub spectra: Array3<f64>,
}

/// Weighted arithmetic mean across realizations, per site and level
///
/// `weights` must match the number of curve sets; `None` means uniform
/// (sampled logic tree). Weights are normalized over the sets present.
pub fn mean_curve(curves: &[CurveMatrix], weights: Option<&[f64]>) -> CurveMatrix {
    debug_assert!(!curves.is_empty());
    let uniform = vec![1.0; curves.len()];
    let weights = weights.unwrap_or(&uniform);
    let total: f64 = weights.iter().sum();
    let mut out = Array2::zeros(curves[0].raw_dim());
    for (c, &w) in curves.iter().zip(weights) {
        out.scaled_add(w / total, c);
    }
    out
}

/// Weighted quantile across realizations, per site and level
///
/// Per cell, the values across realizations are sorted ascending and the
/// value at cumulative weight `q` is linearly interpolated, clamping
/// outside the span. Uniform weights are used when `weights` is `None`.
pub fn quantile_curve(
    curves: &[CurveMatrix],
    quantile: f64,
    weights: Option<&[f64]>,
) -> Result<CurveMatrix> {
    if !(0.0..=1.0).contains(&quantile) {
        return Err(Error::InvalidParameter {
            name: "quantile",
            message: format!("{quantile} is not in [0, 1]"),
        });
    }
    debug_assert!(!curves.is_empty());
    let uniform = vec![1.0; curves.len()];
    let weights = weights.unwrap_or(&uniform);
    let total: f64 = weights.iter().sum();

    let dim = curves[0].raw_dim();
    let mut out = Array2::zeros(dim);
    let mut cell: Vec<(f64, f64)> = Vec::with_capacity(curves.len());
    for ((site, level), value) in out.indexed_iter_mut() {
        cell.clear();
        cell.extend(
            curves
                .iter()
                .zip(weights)
                .map(|(c, &w)| (c[[site, level]], w / total)),
        );
        cell.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut cum = 0.0;
        let cum_weights: Vec<f64> = cell
            .iter()
            .map(|(_, w)| {
                cum += w;
                cum
            })
            .collect();
        let values: Vec<f64> = cell.iter().map(|(v, _)| *v).collect();
        *value = interp(quantile, &cum_weights, &values);
    }
    Ok(out)
}

/// Hazard maps of shape (sites, imts, poes): the intensity level whose
/// exceedance probability equals each target poe
///
/// Interpolation runs in log-intensity space over the curve reversed into
/// ascending-poe order; targets outside the curve clamp to its endpoints.
pub fn compute_hazard_maps(curves: &CurveMatrix, imtls: &Imtls, poes: &[f64]) -> Array3<f64> {
    let n_sites = curves.nrows();
    let mut maps = zero_maps(n_sites, imtls, poes.len());
    for (k, (_imt, levels, range)) in imtls.iter().enumerate() {
        let log_imls: Vec<f64> = levels.iter().rev().map(|l| l.ln()).collect();
        for site in 0..n_sites {
            let row = curves.row(site);
            let poes_asc: Vec<f64> = range.clone().rev().map(|j| row[j]).collect();
            for (p, &poe) in poes.iter().enumerate() {
                maps[[site, k, p]] = interp(poe, &poes_asc, &log_imls).exp();
            }
        }
    }
    maps
}

/// Uniform hazard spectra from hazard maps, or `None` when no intensity
/// measure type carries a spectral period
pub fn make_uhs(
    maps: &Array3<f64>,
    imtls: &Imtls,
    poes: &[f64],
) -> Option<UniformHazardSpectra> {
    let mut spectral: Vec<(f64, usize)> = imtls
        .imts()
        .enumerate()
        .filter_map(|(k, imt)| imt.period().map(|p| (p, k)))
        .collect();
    if spectral.is_empty() {
        return None;
    }
    spectral.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n_sites = maps.dim().0;
    let mut spectra = Array3::zeros((n_sites, poes.len(), spectral.len()));
    for site in 0..n_sites {
        for p in 0..poes.len() {
            for (j, &(_, k)) in spectral.iter().enumerate() {
                spectra[[site, p, j]] = maps[[site, k, p]];
            }
        }
    }
    Some(UniformHazardSpectra {
        periods: spectral.into_iter().map(|(p, _)| p).collect(),
        spectra,
    })
}

/// Piecewise-linear interpolation with endpoint clamping, `xp` ascending
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(!xp.is_empty());
    if x <= xp[0] {
        return fp[0];
    }
    let last = xp.len() - 1;
    if x >= xp[last] {
        return fp[last];
    }
    let i = xp.partition_point(|&v| v < x) - 1;
    let t = (x - xp[i]) / (xp[i + 1] - xp[i]);
    fp[i] + t * (fp[i + 1] - fp[i])
}
