//! Core calculation types
//!
//! Identifiers, sites, sources and calculation parameters shared by the
//! whole pipeline. Everything here is immutable once a calculation starts.

use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Unique identifier for a tectonic region type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrtId(pub String);

impl fmt::Display for TrtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrtId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a seismic source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a ground-motion model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GsimId(pub String);

impl fmt::Display for GsimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GsimId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable integer identifier for a site
///
/// Ids are assigned once on the complete site collection and survive
/// filtering and tiling, so partial results can always be re-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Intensity measure type
///
/// Stored by canonical name, e.g. `PGA` or `SA(0.3)`. Spectral types expose
/// their oscillator period so hazard maps can be reshaped into uniform
/// hazard spectra; PGA counts as period 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Imt(pub String);

impl Imt {
    /// Spectral acceleration at the given period in seconds
    pub fn sa(period: f64) -> Self {
        Self(format!("SA({period})"))
    }

    /// Oscillator period in seconds, if this type belongs to the
    /// spectral-acceleration family
    pub fn period(&self) -> Option<f64> {
        if self.0 == "PGA" {
            return Some(0.0);
        }
        self.0
            .strip_prefix("SA(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|p| p.parse().ok())
    }
}

impl fmt::Display for Imt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Imt {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Intensity measure levels per type
///
/// Defines the shape of every curve array: curves are flattened to
/// (sites x total_levels) with one contiguous column range per type, in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imtls {
    levels: IndexMap<Imt, Vec<f64>>,
}

impl Imtls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the levels for one intensity measure type
    pub fn insert(&mut self, imt: Imt, levels: Vec<f64>) {
        self.levels.insert(imt, levels);
    }

    /// Number of intensity measure types
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of levels across all types (the curve width)
    pub fn total_levels(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    /// Levels for one type
    pub fn levels(&self, imt: &Imt) -> Option<&[f64]> {
        self.levels.get(imt).map(Vec::as_slice)
    }

    /// Column range of one type within the flattened curve matrix
    pub fn range_of(&self, imt: &Imt) -> Option<Range<usize>> {
        let mut offset = 0;
        for (key, levels) in &self.levels {
            if key == imt {
                return Some(offset..offset + levels.len());
            }
            offset += levels.len();
        }
        None
    }

    /// Iterate types with their levels and column ranges, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Imt, &[f64], Range<usize>)> {
        let mut offset = 0;
        self.levels.iter().map(move |(imt, levels)| {
            let range = offset..offset + levels.len();
            offset = range.end;
            (imt, levels.as_slice(), range)
        })
    }

    /// Intensity measure types in insertion order
    pub fn imts(&self) -> impl Iterator<Item = &Imt> {
        self.levels.keys()
    }
}

/// A single site of interest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    /// Longitude in degrees, in [-180, 180]
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

/// Ordered, immutable collection of sites
///
/// A complete collection has ids 0..n in order; filtered subsets and tiles
/// keep the original ids so results can be scattered back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCollection {
    sites: Vec<Site>,
}

impl SiteCollection {
    /// Build the complete collection from (lon, lat) pairs, assigning ids
    /// in order
    pub fn new(locations: &[(f64, f64)]) -> Self {
        let sites = locations
            .iter()
            .enumerate()
            .map(|(i, &(lon, lat))| Site {
                id: SiteId(i as u32),
                lon,
                lat,
            })
            .collect();
        Self { sites }
    }

    /// Build a collection from already-identified sites (filtered subsets,
    /// tiles)
    pub fn from_sites(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    /// Site ids in collection order
    pub fn sids(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.sites.iter().map(|s| s.id)
    }

    /// Subset at the given row positions, keeping original ids
    pub fn filtered(&self, indices: &[usize]) -> Self {
        Self {
            sites: indices.iter().map(|&i| self.sites[i]).collect(),
        }
    }

    /// Split into at most `hint` contiguous tiles, each tagged with its
    /// starting position in this collection
    pub fn split(&self, hint: usize) -> Vec<Tile> {
        let hint = hint.max(1);
        let chunk = self.sites.len().div_ceil(hint).max(1);
        self.sites
            .chunks(chunk)
            .enumerate()
            .map(|(i, sites)| Tile {
                position: i * chunk,
                sites: SiteCollection::from_sites(sites.to_vec()),
            })
            .collect()
    }
}

/// A contiguous subset of a site collection, processed as an independent
/// sub-calculation
#[derive(Debug, Clone)]
pub struct Tile {
    /// Starting row of this tile in the parent collection
    pub position: usize,
    pub sites: SiteCollection,
}

/// Immutable description of a seismic source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub trt: TrtId,
    /// Computational cost estimate used for load balancing
    pub weight: f64,
    /// Representative longitude in degrees
    pub lon: f64,
    /// Representative latitude in degrees
    pub lat: f64,
}

/// Scalar parameters of a classical calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcParams {
    /// Intensity measure types and levels
    pub imtls: Imtls,
    /// Maximum source-site distance in km for the pre-filter
    pub maximum_distance: f64,
    /// Truncation of the ground-motion distribution, in standard
    /// deviations; `None` means no truncation
    pub truncation_level: Option<f64>,
    /// Target number of parallel tasks (0 or 1 = sequential)
    pub concurrent_tasks: usize,
    /// Accumulate disaggregation bounding boxes
    pub poes_disagg: bool,
    /// Quantiles of the hazard-curve distribution to compute
    pub quantile_hazard_curves: Vec<f64>,
    /// Compute the weighted mean curve
    pub mean_hazard_curves: bool,
    /// Probabilities of exceedance for hazard maps
    pub poes: Vec<f64>,
    /// Extract hazard maps at the requested poes
    pub hazard_maps: bool,
    /// Derive uniform hazard spectra from the hazard maps
    pub uniform_hazard_spectra: bool,
    /// Keep per-realization curves in the result
    pub individual_curves: bool,
    /// Number of logic-tree samples; 0 means full enumeration, in which
    /// case statistics are weighted by realization weight
    pub number_of_logic_tree_samples: usize,
}

impl Default for CalcParams {
    fn default() -> Self {
        Self {
            imtls: Imtls::new(),
            maximum_distance: 200.0,
            truncation_level: Some(3.0),
            concurrent_tasks: 1,
            poes_disagg: false,
            quantile_hazard_curves: Vec::new(),
            mean_hazard_curves: true,
            poes: Vec::new(),
            hazard_maps: false,
            uniform_hazard_spectra: false,
            individual_curves: true,
            number_of_logic_tree_samples: 0,
        }
    }
}
