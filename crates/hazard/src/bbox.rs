//! Disaggregation bounding boxes
//!
//! For every (source-model ordinal, site) pair the calculation can track
//! the range of rupture distances and the geographic extent of all ruptures
//! considered. Disaggregation later derives its histogram bin edges from
//! these boxes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo::{longitudinal_extent, spherical_bounding_box};
use crate::types::SiteId;

/// Distance and geographic extent of the ruptures affecting one site under
/// one source model
///
/// Starts empty; folding in samples is order-independent because the old
/// extreme values are merged back into each new sample batch before the
/// box is recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Ordinal of the source model in the logic tree
    pub sm_ordinal: usize,
    pub site_id: SiteId,
    extent: Option<Extent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Extent {
    min_dist: f64,
    max_dist: f64,
    west: f64,
    east: f64,
    south: f64,
    north: f64,
}

/// Evenly spaced disaggregation bin edges, snapped outward to bin-width
/// multiples
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    pub dist_edges: Vec<f64>,
    pub lon_edges: Vec<f64>,
    pub lat_edges: Vec<f64>,
}

impl BoundingBox {
    pub fn new(sm_ordinal: usize, site_id: SiteId) -> Self {
        Self {
            sm_ordinal,
            site_id,
            extent: None,
        }
    }

    /// True until the first sample batch is folded in
    pub fn is_empty(&self) -> bool {
        self.extent.is_none()
    }

    /// Fold in rupture-derived samples, enlarging the box if needed
    pub fn update(&mut self, dists: &[f64], lons: &[f64], lats: &[f64]) -> Result<()> {
        let mut dists = dists.to_vec();
        let mut lons = lons.to_vec();
        let mut lats = lats.to_vec();
        if let Some(e) = &self.extent {
            dists.extend([e.min_dist, e.max_dist]);
            lons.extend([e.west, e.east]);
            lats.extend([e.south, e.north]);
        }
        let min_dist = dists.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_dist = dists.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (west, east, north, south) = spherical_bounding_box(&lons, &lats)?;
        self.extent = Some(Extent {
            min_dist,
            max_dist,
            west,
            east,
            south,
            north,
        });
        Ok(())
    }

    /// Enlarge this box to cover another one; merging an empty box is a
    /// no-op
    pub fn update_bb(&mut self, bb: &BoundingBox) -> Result<()> {
        if let Some(e) = &bb.extent {
            self.update(
                &[e.min_dist, e.max_dist],
                &[e.west, e.east],
                &[e.south, e.north],
            )?;
        }
        Ok(())
    }

    /// Bin edges for disaggregation histograms, or `None` while the box is
    /// still empty
    ///
    /// Distance and latitude edges are bin-width multiples covering the
    /// observed range; longitude edges are evenly spaced across the
    /// (antimeridian-aware) longitudinal extent after snapping west and
    /// east outward.
    pub fn bins_edges(&self, dist_bin_width: f64, coord_bin_width: f64) -> Option<BinEdges> {
        let e = self.extent.as_ref()?;

        let lo = (e.min_dist / dist_bin_width).floor() as i64;
        let hi = (e.max_dist / dist_bin_width).ceil() as i64;
        let dist_edges = (lo..=hi).map(|i| i as f64 * dist_bin_width).collect();

        let west = (e.west / coord_bin_width).floor() * coord_bin_width;
        let east = (e.east / coord_bin_width).ceil() * coord_bin_width;
        let lon_extent = longitudinal_extent(west, east).rem_euclid(360.0);
        let n_lon = (lon_extent / coord_bin_width).round() as usize + 1;
        let lon_edges = (0..n_lon)
            .map(|i| {
                let lon = west + i as f64 * coord_bin_width;
                // wrap back into [-180, 180]
                if lon > 180.0 {
                    lon - 360.0
                } else {
                    lon
                }
            })
            .collect();

        let lo = (e.south / coord_bin_width).floor() as i64;
        let hi = (e.north / coord_bin_width).ceil() as i64;
        let lat_edges = (lo..=hi).map(|i| i as f64 * coord_bin_width).collect();

        Some(BinEdges {
            dist_edges,
            lon_edges,
            lat_edges,
        })
    }
}
