//! Firesheds and fireplains around an area of concern

use crate::core_types::{check_frames, Columns, FeatureCollection, FireKey, Hectares, NodeId, SquareMeters};
use crate::error::{ErrorReport, Result};
use crate::grid::HexGrid;
use crate::overlay::{node_ids, project_many};
use crate::vectors::{SpreadVector, VectorTable};
use geo::{Area, BooleanOps, MultiPolygon};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Options for [`fireshed`] and [`fireplain`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaOfConcernOptions {
    pub columns: Columns,
}

/// Dissolved perimeters of the fires linked to an area of concern
#[derive(Debug, Clone, PartialEq)]
pub struct Shed {
    pub geometry: MultiPolygon<f64>,
    pub area: Hectares,
    /// Contributing fires, ascending
    pub fires: Vec<FireKey>,
    pub report: ErrorReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Destination,
    Origin,
}

impl Role {
    fn node(self, vector: &SpreadVector) -> NodeId {
        match self {
            Role::Destination => vector.destination,
            Role::Origin => vector.origin,
        }
    }
}

/// Union of the perimeters of every fire that spread into the area of concern
///
/// # Errors
///
/// Returns [`Error::CrsMismatch`](crate::Error::CrsMismatch) for inconsistent
/// frames and attribute errors for unreadable fire or iteration columns.
pub fn fireshed(
    vectors: &VectorTable,
    area_of_concern: &FeatureCollection,
    fires: &FeatureCollection,
    grid: &HexGrid,
    options: &AreaOfConcernOptions,
) -> Result<Shed> {
    dissolve_linked(vectors, area_of_concern, fires, grid, options, Role::Destination)
}

/// Union of the perimeters of every fire that spread out of the area of concern
///
/// # Errors
///
/// Same as [`fireshed`].
pub fn fireplain(
    vectors: &VectorTable,
    area_of_concern: &FeatureCollection,
    fires: &FeatureCollection,
    grid: &HexGrid,
    options: &AreaOfConcernOptions,
) -> Result<Shed> {
    dissolve_linked(vectors, area_of_concern, fires, grid, options, Role::Origin)
}

fn dissolve_linked(
    vectors: &VectorTable,
    area_of_concern: &FeatureCollection,
    fires: &FeatureCollection,
    grid: &HexGrid,
    options: &AreaOfConcernOptions,
    role: Role,
) -> Result<Shed> {
    let mut report = ErrorReport::new();
    check_frames(
        &[
            ("area of concern", area_of_concern.crs.as_ref()),
            ("fire perimeters", fires.crs.as_ref()),
            ("hexagons", grid.crs()),
        ],
        &mut report,
    )?;

    let aoc_parts: Vec<MultiPolygon<f64>> = area_of_concern
        .iter()
        .filter_map(|f| f.polygons().map(MultiPolygon::new))
        .collect();
    let aoc_hexes: FxHashSet<NodeId> = node_ids(&project_many(&aoc_parts, grid, 0.0))
        .into_iter()
        .collect();

    let mut linked: Vec<FireKey> = vectors
        .iter()
        .filter(|v| aoc_hexes.contains(&role.node(v)))
        .map(|v| v.fire)
        .collect();
    linked.sort_unstable();
    linked.dedup();

    let columns = &options.columns;
    let mut perimeters: Vec<MultiPolygon<f64>> = Vec::new();
    for feature in fires {
        let key = FireKey {
            fire: feature.int(&columns.fire, "fire record")?,
            iteration: feature.int_opt(&columns.iteration)?,
        };
        if !linked.iter().any(|k| k.matches(&key)) {
            continue;
        }
        if let Some(parts) = feature.polygons() {
            perimeters.push(MultiPolygon::new(parts));
        }
    }

    let geometry = perimeters
        .into_par_iter()
        .reduce_with(|a, b| a.union(&b))
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()));
    let area = SquareMeters::new(geometry.unsigned_area()).to_hectares();

    info!(
        "{:?} shed: {} of {} area-of-concern hexagons, {} fires, {}",
        role,
        aoc_hexes.len(),
        grid.len(),
        linked.len(),
        area
    );
    Ok(Shed {
        geometry,
        area,
        fires: linked,
        report,
    })
}
