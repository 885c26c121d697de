//! Daily-progression spread vectors
//!
//! Replays each fire day by day. Hexagons reached for the first time on day
//! `d` are linked to the previous day's leading edge. A separate batch tagged
//! [`FINAL_EXTENT_DAY`] links the ignition hexagon to the full final extent.

use super::{perimeter_of, run_per_fire, IgnitionPoints, SpreadVector, VectorRun, VectorTable, FINAL_EXTENT_DAY};
use crate::core_types::{check_frames, Columns, Feature, FeatureCollection, FireKey, NodeId};
use crate::error::{Error, ErrorReport, FireError, Result};
use crate::grid::HexGrid;
use crate::overlay::{circle, engulf_threshold, hexes_near_boundary, node_ids, project_many};
use geo::MultiPolygon;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Width of the band around a day's perimeter searched for the leading edge
const LEAD_EDGE_BAND: f64 = 1.0;

/// Options for [`generate_daily_vectors`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVectorOptions {
    /// Radius of the ignition buffer; also sets the engulf threshold
    /// `π·r² − 1`. Small enough that the buffer sits in one hexagon.
    pub buffer_factor: f64,
    pub columns: Columns,
}

impl Default for DailyVectorOptions {
    fn default() -> Self {
        Self {
            buffer_factor: 10.0,
            columns: Columns::default(),
        }
    }
}

/// Perimeters of one fire by day
type DailyPerimeters<'a> = BTreeMap<u32, Vec<&'a Feature>>;

/// Vectors from each day's leading edge to the hexagons first reached that day
///
/// The leading edge starts as the ignition hexagon. After each day it becomes
/// the hexagons within [`LEAD_EDGE_BAND`] of that day's perimeter rings that
/// were not burned before the day; a day with no such hexagons keeps the
/// previous edge.
///
/// # Errors
///
/// Returns [`Error::CrsMismatch`] for inconsistent reference frames and
/// attribute errors for unreadable fire or day columns. Per-fire failures are
/// recorded in the run's report instead.
pub fn generate_daily_vectors(
    daily_fires: &FeatureCollection,
    ignitions: &FeatureCollection,
    grid: &HexGrid,
    options: &DailyVectorOptions,
) -> Result<VectorRun> {
    let mut report = ErrorReport::new();
    check_frames(
        &[
            ("daily fire perimeters", daily_fires.crs.as_ref()),
            ("ignition points", ignitions.crs.as_ref()),
            ("hexagons", grid.crs()),
        ],
        &mut report,
    )?;

    let columns = &options.columns;
    let mut grouped: BTreeMap<FireKey, DailyPerimeters<'_>> = BTreeMap::new();
    for feature in daily_fires {
        let key = FireKey::from_feature(feature, columns, false)?;
        let day = read_day(feature, columns)?;
        grouped
            .entry(key)
            .or_default()
            .entry(day)
            .or_default()
            .push(feature);
    }
    let groups: Vec<(FireKey, DailyPerimeters<'_>)> = grouped.into_iter().collect();
    let points = IgnitionPoints::from_collection(ignitions, columns, false)?;

    info!(
        "Generating daily vectors for {} fires, buffer factor {}",
        groups.len(),
        options.buffer_factor
    );

    let vectors = run_per_fire(&groups, &mut report, |key, days| {
        let (ignition, point) = points.locate(key, grid)?;
        let mut perimeters: BTreeMap<u32, Vec<MultiPolygon<f64>>> = BTreeMap::new();
        for (day, records) in days {
            let polys = records
                .iter()
                .copied()
                .map(perimeter_of)
                .collect::<std::result::Result<Vec<_>, FireError>>()?;
            perimeters.insert(*day, polys);
        }
        let seed = MultiPolygon::new(vec![circle(point, options.buffer_factor)]);
        spread_by_day(key, ignition, seed, &perimeters, grid, options.buffer_factor)
    });

    info!(
        "Generated {} daily vectors, {} fires skipped",
        vectors.len(),
        report.fire_errors.len()
    );
    Ok(VectorRun {
        vectors: VectorTable::new(vectors),
        report,
    })
}

fn read_day(feature: &Feature, columns: &Columns) -> Result<u32> {
    let day = feature.int(&columns.day, "daily perimeter record")?;
    u32::try_from(day).map_err(|_| Error::InvalidAttribute {
        column: columns.day.clone(),
        value: day.to_string(),
        expected: "a non-negative day",
    })
}

/// Day loop of one fire
fn spread_by_day(
    key: FireKey,
    ignition: NodeId,
    seed: MultiPolygon<f64>,
    perimeters: &BTreeMap<u32, Vec<MultiPolygon<f64>>>,
    grid: &HexGrid,
    buffer_factor: f64,
) -> std::result::Result<Vec<SpreadVector>, FireError> {
    let threshold = engulf_threshold(buffer_factor);
    let Some((&max_day, final_perimeter)) = perimeters.iter().next_back() else {
        return Err(FireError::EmptyPerimeter);
    };

    let mut seen: FxHashSet<(NodeId, NodeId, u32)> = FxHashSet::default();
    let mut out = Vec::new();
    let mut emit = |origin: NodeId, destination: NodeId, day: u32, out: &mut Vec<SpreadVector>| {
        if origin != destination && seen.insert((origin, destination, day)) {
            out.push(
                SpreadVector::new(origin, destination, key)
                    .on_day(day)
                    .with_ignition(ignition),
            );
        }
    };

    for hex in project_many(final_perimeter, grid, threshold) {
        emit(ignition, hex.node_id, FINAL_EXTENT_DAY, &mut out);
    }

    let mut lead_edge = vec![ignition];
    let mut prior_footprint = vec![seed];
    for day in 1..=max_day {
        let today: &[MultiPolygon<f64>] = perimeters.get(&day).map(Vec::as_slice).unwrap_or_default();
        let todays_hexes = node_ids(&project_many(today, grid, threshold));
        let prior_hexes: FxHashSet<NodeId> = node_ids(&project_many(&prior_footprint, grid, threshold))
            .into_iter()
            .collect();

        let new_hexes: Vec<NodeId> = todays_hexes
            .iter()
            .copied()
            .filter(|id| !prior_hexes.contains(id))
            .collect();
        for origin in &lead_edge {
            for destination in &new_hexes {
                emit(*origin, *destination, day, &mut out);
            }
        }
        debug!(
            "Fire {} day {}: {} new hexagons from a leading edge of {}",
            key,
            day,
            new_hexes.len(),
            lead_edge.len()
        );

        prior_footprint = today.to_vec();
        let candidates: Vec<NodeId> = hexes_near_boundary(today, grid, LEAD_EDGE_BAND)
            .into_iter()
            .filter(|id| !prior_hexes.contains(id))
            .collect();
        if !candidates.is_empty() {
            lead_edge = candidates;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Extent;
    use crate::grid::{build_arcs, build_hex_grid, ArcSet, CellSize, NodeSet};
    use crate::overlay::hexes_containing;
    use geo::{Centroid, Point};

    fn landscape() -> (HexGrid, NodeSet) {
        build_hex_grid(Extent::new(0.0, 0.0, 1000.0, 1000.0), CellSize::Side(40.0), None).unwrap()
    }

    fn growing_fire(center: Point<f64>, radii: &[f64]) -> FeatureCollection {
        let features = radii
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Feature::new(circle(center, *r))
                    .with("fire", 1)
                    .with("day", (i + 1) as i64)
            })
            .collect();
        FeatureCollection::with_features(None, features)
    }

    fn centre_node(nodes: &NodeSet) -> Point<f64> {
        let target = Point::new(500.0, 500.0);
        nodes
            .nodes()
            .iter()
            .min_by(|a, b| {
                let da = (a.point.x() - target.x()).hypot(a.point.y() - target.y());
                let db = (b.point.x() - target.x()).hypot(b.point.y() - target.y());
                da.total_cmp(&db)
            })
            .unwrap()
            .point
    }

    #[test]
    fn test_daily_vectors_shape() {
        let (grid, nodes) = landscape();
        let center = centre_node(&nodes);
        let fires = growing_fire(center, &[60.0, 150.0, 260.0]);
        let ignitions =
            FeatureCollection::with_features(None, vec![Feature::new(center).with("fire", 1)]);

        let run = generate_daily_vectors(&fires, &ignitions, &grid, &DailyVectorOptions::default())
            .unwrap();
        assert!(run.report.is_clean());
        let rows = run.vectors.rows();
        assert!(rows.iter().all(|v| !v.is_self_loop()));
        assert!(rows.iter().all(|v| v.ignition == rows[0].ignition));

        let ignition = rows[0].ignition.unwrap();
        assert!(rows
            .iter()
            .filter(|v| v.day == Some(1))
            .all(|v| v.origin == ignition));
        for day in [1, 2, 3, FINAL_EXTENT_DAY] {
            assert!(rows.iter().any(|v| v.day == Some(day)), "no vectors on day {day}");
        }

        let mut keys: Vec<_> = rows.iter().map(|v| (v.origin, v.destination, v.day)).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_new_hexes_cover_final_extent() {
        let (grid, nodes) = landscape();
        let center = centre_node(&nodes);
        let fires = growing_fire(center, &[70.0, 140.0, 220.0, 300.0]);
        let ignitions =
            FeatureCollection::with_features(None, vec![Feature::new(center).with("fire", 1)]);

        let run = generate_daily_vectors(&fires, &ignitions, &grid, &DailyVectorOptions::default())
            .unwrap();
        let rows = run.vectors.rows();
        let final_set: FxHashSet<NodeId> = rows
            .iter()
            .filter(|v| v.day == Some(FINAL_EXTENT_DAY))
            .map(|v| v.destination)
            .collect();
        let reached: FxHashSet<NodeId> = rows
            .iter()
            .filter(|v| v.day != Some(FINAL_EXTENT_DAY))
            .map(|v| v.destination)
            .collect();
        assert_eq!(reached, final_set);
    }

    #[test]
    fn test_ignition_outside_grid_is_skipped() {
        let (grid, nodes) = landscape();
        let center = centre_node(&nodes);
        let fires = growing_fire(center, &[60.0, 120.0]);
        let ignitions = FeatureCollection::with_features(
            None,
            vec![Feature::new(Point::new(-5e5, 0.0)).with("fire", 1)],
        );
        let run = generate_daily_vectors(&fires, &ignitions, &grid, &DailyVectorOptions::default())
            .unwrap();
        assert!(run.vectors.is_empty());
        assert_eq!(run.report.fire_errors.len(), 1);
        assert!(run
            .report
            .to_log_text()
            .starts_with("ignition point is not inside any hexagon occurs for fire ID # 1"));
    }

    /// Fire on a 40 m grid whose daily perimeters are whole hexagons
    struct HexFire {
        grid: HexGrid,
        arcs: ArcSet,
        ignition: NodeId,
        ignition_point: Point<f64>,
    }

    impl HexFire {
        fn new() -> Self {
            let (grid, nodes) =
                build_hex_grid(Extent::new(0.0, 0.0, 400.0, 400.0), CellSize::Side(40.0), None)
                    .unwrap();
            let arcs = build_arcs(&grid);
            let ignition = hexes_containing(Point::new(200.0, 200.0), &grid)[0];
            let ignition_point = nodes.point(ignition).unwrap();
            Self {
                grid,
                arcs,
                ignition,
                ignition_point,
            }
        }

        /// A neighbour of the ignition hexagon and a hexagon beyond it
        fn spread_path(&self) -> (NodeId, NodeId) {
            let near = self.arcs.neighbors(self.ignition)[0];
            let ring = self.arcs.neighbors(self.ignition);
            let far = self
                .arcs
                .neighbors(near)
                .into_iter()
                .find(|id| *id != self.ignition && !ring.contains(id))
                .unwrap();
            (near, far)
        }

        fn day_records(&self, day: i64, hexes: &[NodeId]) -> Vec<Feature> {
            hexes
                .iter()
                .map(|id| {
                    Feature::new(self.grid.cell(*id).unwrap().polygon.clone())
                        .with("fire", 1)
                        .with("day", day)
                })
                .collect()
        }

        /// Hexagons touching any of `hexes`, plus `hexes` themselves
        fn band(&self, hexes: &[NodeId]) -> FxHashSet<NodeId> {
            let mut band: FxHashSet<NodeId> = hexes.iter().copied().collect();
            for id in hexes {
                band.extend(self.arcs.neighbors(*id));
            }
            band
        }

        fn run(&self, records: Vec<Feature>, ignitions: Vec<Feature>) -> VectorRun {
            generate_daily_vectors(
                &FeatureCollection::with_features(None, records),
                &FeatureCollection::with_features(None, ignitions),
                &self.grid,
                &DailyVectorOptions::default(),
            )
            .unwrap()
        }
    }

    fn triples(run: &VectorRun) -> FxHashSet<(NodeId, NodeId, u32)> {
        let set: FxHashSet<_> = run
            .vectors
            .iter()
            .map(|v| (v.origin, v.destination, v.day.unwrap()))
            .collect();
        assert_eq!(set.len(), run.vectors.len());
        set
    }

    #[test]
    fn test_leading_edge_is_previous_band_minus_prior_hexes() {
        let fire = HexFire::new();
        let ignition = fire.ignition;
        let (near, far) = fire.spread_path();

        let mut records = fire.day_records(1, &[ignition, near]);
        records.extend(fire.day_records(2, &[ignition, near, far]));
        let run = fire.run(records, vec![Feature::new(fire.ignition_point).with("fire", 1)]);
        assert!(run.report.is_clean());

        let mut expected: FxHashSet<(NodeId, NodeId, u32)> = FxHashSet::default();
        expected.insert((ignition, near, FINAL_EXTENT_DAY));
        expected.insert((ignition, far, FINAL_EXTENT_DAY));
        expected.insert((ignition, near, 1));
        // day 1 burned {ignition, near}; only the ignition hexagon burned before it
        for origin in fire.band(&[ignition, near]) {
            if origin != ignition && origin != far {
                expected.insert((origin, far, 2));
            }
        }
        assert_eq!(triples(&run), expected);
    }

    #[test]
    fn test_day_without_perimeter_keeps_leading_edge() {
        let fire = HexFire::new();
        let ignition = fire.ignition;
        let (near, far) = fire.spread_path();

        // nothing recorded on day 2
        let mut records = fire.day_records(1, &[ignition, near]);
        records.extend(fire.day_records(3, &[ignition, near, far]));
        let run = fire.run(records, vec![Feature::new(fire.ignition_point).with("fire", 1)]);
        assert!(run.report.is_clean());

        let lead_edge: Vec<NodeId> = fire
            .band(&[ignition, near])
            .into_iter()
            .filter(|id| *id != ignition)
            .collect();
        let mut expected: FxHashSet<(NodeId, NodeId, u32)> = FxHashSet::default();
        expected.insert((ignition, near, FINAL_EXTENT_DAY));
        expected.insert((ignition, far, FINAL_EXTENT_DAY));
        expected.insert((ignition, near, 1));
        // the empty day leaves no prior footprint, so every day-3 hexagon is new
        for origin in &lead_edge {
            for destination in [ignition, near, far] {
                if *origin != destination {
                    expected.insert((*origin, destination, 3));
                }
            }
        }
        assert_eq!(triples(&run), expected);
        assert!(run.vectors.iter().all(|v| v.day != Some(2)));
    }

    #[test]
    fn test_ignitions_in_two_hexagons_skip_the_fire() {
        let fire = HexFire::new();
        let (near, _) = fire.spread_path();
        let near_point = fire.grid.cell(near).unwrap().polygon.centroid().unwrap();

        let records = fire.day_records(1, &[fire.ignition, near]);
        let ignitions = vec![
            Feature::new(fire.ignition_point).with("fire", 1),
            Feature::new(near_point).with("fire", 1),
        ];
        let run = fire.run(records, ignitions);
        assert!(run.vectors.is_empty());
        assert_eq!(run.report.fire_errors.len(), 1);
        assert_eq!(
            run.report.fire_errors[0].message,
            FireError::MultipleIgnitionHexagons(2).to_string()
        );
    }

    #[test]
    fn test_negative_day_rejected() {
        let (grid, _) = landscape();
        let fires = FeatureCollection::with_features(
            None,
            vec![Feature::new(circle(Point::new(100.0, 100.0), 20.0))
                .with("fire", 1)
                .with("day", -2)],
        );
        let err = generate_daily_vectors(
            &fires,
            &FeatureCollection::default(),
            &grid,
            &DailyVectorOptions::default(),
        );
        assert!(matches!(err, Err(Error::InvalidAttribute { .. })));
    }
}
