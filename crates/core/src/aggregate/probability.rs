//! Per-hexagon likelihood surfaces

use crate::core_types::{check_frames, Columns, Feature, FeatureCollection, FireKey, NodeId};
use crate::error::{Error, ErrorReport, Result};
use crate::grid::HexGrid;
use crate::overlay::{hexes_containing, project_onto_hex};
use crate::vectors::VectorTable;
use geo::MultiPolygon;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Occurrence count and percentage of one hexagon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexProbability {
    pub node_id: NodeId,
    pub count: u32,
    /// `count / iterations · 100`
    pub probability: f64,
}

/// Source-sink ratio of one hexagon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceSinkRow {
    pub node_id: NodeId,
    pub as_source: u32,
    pub as_sink: u32,
    /// `log10(as_source / as_sink)`
    pub ssr: f64,
}

/// Output of [`burn_probability`] or [`ignition_probability`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityRun {
    /// One row per grid hexagon, ascending id
    pub rows: Vec<HexProbability>,
    pub report: ErrorReport,
}

/// Options for [`burn_probability`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnProbabilityOptions {
    /// Minimum intersection area for a hexagon to count as burned
    pub threshold: f64,
    pub columns: Columns,
}

impl Default for BurnProbabilityOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            columns: Columns::default(),
        }
    }
}

fn check_iterations(iterations: u32) -> Result<f64> {
    if iterations == 0 {
        return Err(Error::InvalidIterations(iterations));
    }
    Ok(f64::from(iterations))
}

/// One row per grid hexagon in id order, zero where nothing was counted
fn zero_filled(grid: &HexGrid, counts: &FxHashMap<NodeId, u32>, iterations: f64) -> Vec<HexProbability> {
    let mut rows: Vec<HexProbability> = grid
        .cells()
        .iter()
        .map(|cell| {
            let count = counts.get(&cell.node_id).copied().unwrap_or(0);
            HexProbability {
                node_id: cell.node_id,
                count,
                probability: f64::from(count) / iterations * 100.0,
            }
        })
        .collect();
    rows.sort_unstable_by_key(|row| row.node_id);
    rows
}

/// Percentage of iterations in which each hexagon burned
///
/// A hexagon is counted once per distinct fire overlapping it by more than
/// `options.threshold`. Fires are keyed by fire id plus the iteration column
/// when present. Undefined reference frames and non-polygon records are
/// noted on the returned report.
///
/// # Errors
///
/// Returns [`Error::InvalidIterations`] for zero iterations,
/// [`Error::CrsMismatch`] for inconsistent frames and attribute errors for
/// unreadable fire or iteration columns.
pub fn burn_probability(
    fires: &FeatureCollection,
    grid: &HexGrid,
    iterations: u32,
    options: &BurnProbabilityOptions,
) -> Result<ProbabilityRun> {
    let denominator = check_iterations(iterations)?;
    let mut report = ErrorReport::new();
    check_frames(
        &[("fire perimeters", fires.crs.as_ref()), ("hexagons", grid.crs())],
        &mut report,
    )?;

    let columns = &options.columns;
    let mut perimeters: Vec<(FireKey, MultiPolygon<f64>)> = Vec::with_capacity(fires.len());
    for feature in fires {
        let key = FireKey {
            fire: feature.int(&columns.fire, "fire record")?,
            iteration: feature.int_opt(&columns.iteration)?,
        };
        if let Some(parts) = feature.polygons() {
            perimeters.push((key, MultiPolygon::new(parts)));
        } else {
            let message = format!("fire record {key} is not a polygon, ignoring it");
            warn!("{}", message);
            report.warn(message);
        }
    }

    let hits: Vec<(NodeId, FireKey)> = perimeters
        .par_iter()
        .flat_map_iter(|(key, perimeter)| {
            project_onto_hex(perimeter, grid, options.threshold)
                .into_iter()
                .map(move |hex| (hex.node_id, *key))
        })
        .collect();

    let mut burned: FxHashMap<NodeId, FxHashSet<FireKey>> = FxHashMap::default();
    for (node_id, key) in hits {
        burned.entry(node_id).or_default().insert(key);
    }
    let counts: FxHashMap<NodeId, u32> = burned
        .into_iter()
        .map(|(node_id, keys)| (node_id, keys.len() as u32))
        .collect();

    info!(
        "Burn probability: {} of {} hexagons burned at least once",
        counts.len(),
        grid.len()
    );
    Ok(ProbabilityRun {
        rows: zero_filled(grid, &counts, denominator),
        report,
    })
}

/// Percentage of iterations in which each hexagon held an ignition
///
/// # Errors
///
/// Returns [`Error::InvalidIterations`] for zero iterations and
/// [`Error::CrsMismatch`] for inconsistent frames.
pub fn ignition_probability(
    ignitions: &FeatureCollection,
    grid: &HexGrid,
    iterations: u32,
) -> Result<ProbabilityRun> {
    let denominator = check_iterations(iterations)?;
    let mut report = ErrorReport::new();
    check_frames(
        &[("ignition points", ignitions.crs.as_ref()), ("hexagons", grid.crs())],
        &mut report,
    )?;

    let mut counts: FxHashMap<NodeId, u32> = FxHashMap::default();
    for point in ignitions.iter().filter_map(Feature::point) {
        for node_id in hexes_containing(point, grid) {
            *counts.entry(node_id).or_insert(0) += 1;
        }
    }
    Ok(ProbabilityRun {
        rows: zero_filled(grid, &counts, denominator),
        report,
    })
}

/// Source-sink ratio of every grid hexagon that is both an origin and a
/// destination
///
/// Hexagons lacking either role have no ratio and are left out.
pub fn source_sink_ratio(vectors: &VectorTable, grid: &HexGrid) -> Vec<SourceSinkRow> {
    let mut as_source: FxHashMap<NodeId, u32> = FxHashMap::default();
    let mut as_sink: FxHashMap<NodeId, u32> = FxHashMap::default();
    for v in vectors {
        *as_source.entry(v.origin).or_insert(0) += 1;
        *as_sink.entry(v.destination).or_insert(0) += 1;
    }

    let mut rows: Vec<SourceSinkRow> = grid
        .cells()
        .iter()
        .filter_map(|cell| {
            let source = *as_source.get(&cell.node_id)?;
            let sink = *as_sink.get(&cell.node_id)?;
            Some(SourceSinkRow {
                node_id: cell.node_id,
                as_source: source,
                as_sink: sink,
                ssr: (f64::from(source) / f64::from(sink)).log10(),
            })
        })
        .collect();
    rows.sort_unstable_by_key(|row| row.node_id);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Crs, Extent};
    use crate::grid::{build_hex_grid, CellSize};
    use crate::overlay::circle;
    use crate::vectors::SpreadVector;
    use approx::assert_relative_eq;
    use geo::Point;

    fn grid() -> (HexGrid, crate::grid::NodeSet) {
        build_hex_grid(Extent::new(0.0, 0.0, 300.0, 300.0), CellSize::Side(30.0), None).unwrap()
    }

    #[test]
    fn test_burn_probability_counts_distinct_fires() {
        let (grid, nodes) = grid();
        let center = nodes.nodes()[12].point;
        // fire 1 has two overlapping records; it still counts once
        let fires = FeatureCollection::with_features(
            None,
            vec![
                Feature::new(circle(center, 5.0)).with("fire", 1),
                Feature::new(circle(center, 8.0)).with("fire", 1),
                Feature::new(circle(center, 5.0)).with("fire", 2),
            ],
        );
        let rows = burn_probability(&fires, &grid, 4, &BurnProbabilityOptions::default())
            .unwrap()
            .rows;
        assert_eq!(rows.len(), grid.len());

        let hit = rows.iter().find(|r| r.node_id == nodes.nodes()[12].id).unwrap();
        assert_eq!(hit.count, 2);
        assert_relative_eq!(hit.probability, 50.0);
        assert_eq!(rows.iter().filter(|r| r.count > 0).count(), 1);
        assert!(rows.iter().filter(|r| r.count == 0).all(|r| r.probability == 0.0));
    }

    #[test]
    fn test_burn_probability_iterations_nest_fires() {
        let (grid, nodes) = grid();
        let center = nodes.nodes()[12].point;
        let fires = FeatureCollection::with_features(
            None,
            vec![
                Feature::new(circle(center, 5.0)).with("fire", 1).with("iteration", 1),
                Feature::new(circle(center, 5.0)).with("fire", 1).with("iteration", 2),
            ],
        );
        let rows = burn_probability(&fires, &grid, 2, &BurnProbabilityOptions::default())
            .unwrap()
            .rows;
        assert_eq!(rows.iter().map(|r| r.count).max(), Some(2));
        assert!(matches!(
            burn_probability(&fires, &grid, 0, &BurnProbabilityOptions::default()),
            Err(Error::InvalidIterations(0))
        ));
    }

    #[test]
    fn test_ignition_probability_zero_filled() {
        let (grid, nodes) = grid();
        let p = nodes.nodes()[3].point;
        let ignitions = FeatureCollection::with_features(
            None,
            vec![
                Feature::new(p).with("fire", 1),
                Feature::new(p).with("fire", 2),
                Feature::new(Point::new(-1e6, 0.0)).with("fire", 3),
            ],
        );
        let rows = ignition_probability(&ignitions, &grid, 10).unwrap().rows;
        assert_eq!(rows.len(), grid.len());
        let total: u32 = rows.iter().map(|r| r.count).sum();
        assert_eq!(total, 2);
        let hit = rows.iter().find(|r| r.count > 0).unwrap();
        assert_eq!(hit.node_id, nodes.nodes()[3].id);
        assert_relative_eq!(hit.probability, 20.0);
    }

    #[test]
    fn test_probability_runs_carry_warnings() {
        let (grid, nodes) = grid();
        let center = nodes.nodes()[12].point;
        let fires = FeatureCollection::with_features(
            Some(Crs::new("EPSG:3577")),
            vec![
                Feature::new(circle(center, 5.0)).with("fire", 1),
                Feature::new(center).with("fire", 2),
            ],
        );
        // the grid has no frame and fire 2 is a point
        let run = burn_probability(&fires, &grid, 1, &BurnProbabilityOptions::default()).unwrap();
        assert_eq!(run.report.warnings.len(), 2);
        assert!(run.report.warnings[0].contains("hexagons has no defined reference frame"));
        assert!(run.report.warnings[1].contains("not a polygon"));
        assert_eq!(run.rows.iter().map(|r| r.count).sum::<u32>(), 1);

        let ignitions = FeatureCollection::with_features(None, vec![Feature::new(center).with("fire", 1)]);
        let run = ignition_probability(&ignitions, &grid, 1).unwrap();
        assert_eq!(run.report.warnings.len(), 2);
        assert!(run.report.warnings[0].starts_with("ignition points"));
        assert!(run.report.fire_errors.is_empty());
    }

    #[test]
    fn test_source_sink_ratio_excludes_one_sided_hexes() {
        let (grid, _) = grid();
        let v = |o: u32, d: u32| SpreadVector::new(NodeId(o), NodeId(d), FireKey::new(1));
        // 1 is only a source, 3 only a sink, 2 is both
        let table = VectorTable::new(vec![v(1, 2), v(1, 2), v(2, 3), v(1, 3)]);
        let rows = source_sink_ratio(&table, &grid);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].node_id, NodeId(2));
        assert_eq!((rows[0].as_source, rows[0].as_sink), (1, 2));
        assert_relative_eq!(rows[0].ssr, 0.5f64.log10());
    }
}
