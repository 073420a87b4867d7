//! Geodetic utilities
//!
//! Small spherical-earth helpers consumed by the distance pre-filter and
//! the disaggregation bounding boxes. Longitudes are degrees in [-180, 180]
//! and all extents are antimeridian-aware.

use crate::error::{Error, Result};

/// Mean earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Signed longitudinal distance from `lon1` going east to `lon2`,
/// normalized to (-180, 180]
///
/// Positive when `lon2` lies east of `lon1` within half a turn; a negative
/// value for the naive (min, max) pair of a longitude set signals that the
/// set crosses the antimeridian.
pub fn longitudinal_extent(lon1: f64, lon2: f64) -> f64 {
    (lon2 - lon1 + 180.0).rem_euclid(360.0) - 180.0
}

/// Spherical bounding box (west, east, north, south) of a point set
///
/// When the points straddle the antimeridian the box wraps: west is the
/// smallest positive longitude and east the largest negative one. Fails if
/// the set spans more than 180 degrees of longitude, where a bounding box
/// is no longer well defined.
pub fn spherical_bounding_box(lons: &[f64], lats: &[f64]) -> Result<(f64, f64, f64, f64)> {
    debug_assert!(!lons.is_empty() && lons.len() == lats.len());
    let north = lats.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let south = lats.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut west = lons.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut east = lons.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if longitudinal_extent(west, east) < 0.0 {
        // both sides of the antimeridian
        west = lons
            .iter()
            .cloned()
            .filter(|&l| l > 0.0)
            .fold(f64::INFINITY, f64::min);
        east = lons
            .iter()
            .cloned()
            .filter(|&l| l < 0.0)
            .fold(f64::NEG_INFINITY, f64::max);
        let contained = lons.iter().all(|&lon| {
            longitudinal_extent(west, lon) >= 0.0 && longitudinal_extent(lon, east) >= 0.0
        });
        if !contained {
            return Err(Error::WideLongitudinalExtent);
        }
    }
    Ok((west, east, north, south))
}

/// Great-circle distance in km between two points (haversine)
pub fn geodetic_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1) = (lon1.to_radians(), lat1.to_radians());
    let (lon2, lat2) = (lon2.to_radians(), lat2.to_radians());
    let sin_dlat = ((lat2 - lat1) / 2.0).sin();
    let sin_dlon = ((lon2 - lon1) / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_longitudinal_extent() {
        assert_abs_diff_eq!(longitudinal_extent(10.0, 20.0), 10.0);
        assert_abs_diff_eq!(longitudinal_extent(20.0, 10.0), -10.0);
        // across the antimeridian, going east
        assert_abs_diff_eq!(longitudinal_extent(179.0, -179.0), 2.0);
    }

    #[test]
    fn test_bounding_box_plain() {
        let (w, e, n, s) = spherical_bounding_box(&[10.0, 12.0, 11.0], &[40.0, 42.0, 41.0]).unwrap();
        assert_eq!((w, e, n, s), (10.0, 12.0, 42.0, 40.0));
    }

    #[test]
    fn test_bounding_box_antimeridian() {
        let (w, e, n, s) =
            spherical_bounding_box(&[179.0, -179.5, 179.5], &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!((w, e), (179.0, -179.5));
        assert_eq!((n, s), (2.0, 0.0));
    }

    #[test]
    fn test_bounding_box_too_wide() {
        // points spread over more than half the sphere
        let res = spherical_bounding_box(&[0.1, 120.0, -120.0], &[0.0, 0.0, 0.0]);
        assert!(res.is_err());
    }

    #[test]
    fn test_geodetic_distance() {
        // one degree of latitude along a meridian
        let d = geodetic_distance(0.0, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(d, EARTH_RADIUS_KM.to_radians(), epsilon = 1e-9);
        assert_abs_diff_eq!(geodetic_distance(30.0, 10.0, 30.0, 10.0), 0.0, epsilon = 1e-12);
    }
}
