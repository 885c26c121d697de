//! Spread vector generation
//!
//! Fires are independent units of work: each is processed on the rayon pool
//! against the shared, read-only grid, and results are merged in fire-key
//! order. A fire that fails is logged, recorded in the run's
//! [`ErrorReport`](crate::ErrorReport) and contributes no vectors.

pub mod angles;
pub mod daily;
pub mod final_perimeter;
pub mod table;

pub use angles::{compute_angles, select_sector, AngleRun, AngledVector};
pub use daily::{generate_daily_vectors, DailyVectorOptions};
pub use final_perimeter::{generate_fire_vectors, pij_from_vectors, FireVectorOptions, GroupBy, PijRow};
pub use table::{SpreadVector, VectorRun, VectorTable, FINAL_EXTENT_DAY};

use crate::core_types::{Columns, Feature, FeatureCollection, FireKey, NodeId};
use crate::error::{ErrorReport, FireError, Result};
use crate::grid::HexGrid;
use crate::overlay::hexes_containing;
use geo::{MultiPolygon, Point};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Ignition points keyed by fire
pub(crate) struct IgnitionPoints {
    points: Vec<(FireKey, Point<f64>)>,
}

impl IgnitionPoints {
    /// Read ignition records; the iteration column is optional and only read
    /// when `nested` is set
    pub(crate) fn from_collection(ignitions: &FeatureCollection, columns: &Columns, nested: bool) -> Result<Self> {
        let mut points = Vec::with_capacity(ignitions.len());
        for feature in ignitions {
            let fire = feature.int(&columns.fire, "ignition record")?;
            let iteration = if nested {
                feature.int_opt(&columns.iteration)?
            } else {
                None
            };
            match feature.point() {
                Some(point) => points.push((FireKey { fire, iteration }, point)),
                None => warn!("Ignition record for fire {} is not a point, ignoring it", fire),
            }
        }
        Ok(Self { points })
    }

    /// Locate the single hexagon holding the ignition of `key`
    ///
    /// Returns the hexagon and the first matching ignition point.
    pub(crate) fn locate(&self, key: FireKey, grid: &HexGrid) -> std::result::Result<(NodeId, Point<f64>), FireError> {
        let matching: Vec<Point<f64>> = self
            .points
            .iter()
            .filter(|(k, _)| k.matches(&key))
            .map(|(_, p)| *p)
            .collect();
        let Some(first) = matching.first().copied() else {
            return Err(FireError::NoIgnitionPoint);
        };

        let mut hexes: Vec<NodeId> = matching
            .iter()
            .flat_map(|p| hexes_containing(*p, grid))
            .collect();
        hexes.sort_unstable();
        hexes.dedup();
        match hexes.as_slice() {
            [] => Err(FireError::NoIgnitionHexagon),
            [single] => Ok((*single, first)),
            many => Err(FireError::MultipleIgnitionHexagons(many.len())),
        }
    }
}

/// Areal geometry of a perimeter record
pub(crate) fn perimeter_of(feature: &Feature) -> std::result::Result<MultiPolygon<f64>, FireError> {
    feature
        .polygons()
        .map(MultiPolygon::new)
        .ok_or_else(|| FireError::Geometry("perimeter record is not a polygon".to_owned()))
}

/// Run `work` for every fire group in parallel and merge in key order
///
/// `groups` must already be sorted by key.
pub(crate) fn run_per_fire<T, F>(groups: &[(FireKey, T)], report: &mut ErrorReport, work: F) -> Vec<SpreadVector>
where
    T: Sync,
    F: Fn(FireKey, &T) -> std::result::Result<Vec<SpreadVector>, FireError> + Sync,
{
    let results: Vec<(FireKey, std::result::Result<Vec<SpreadVector>, FireError>)> = groups
        .par_iter()
        .map(|(key, group)| (*key, work(*key, group)))
        .collect();

    let mut vectors = Vec::new();
    for (key, result) in results {
        match result {
            Ok(found) => {
                debug!("Fire {}: {} vectors", key, found.len());
                vectors.extend(found);
            }
            Err(error) => {
                warn!("Skipping fire {}: {}", key, error);
                report.record(key, &error);
            }
        }
    }
    vectors
}
