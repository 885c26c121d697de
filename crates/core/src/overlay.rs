//! Overlay classifier: projection of features onto the hexagon grid
//!
//! A feature "projects onto" a hexagon when their intersection area exceeds a
//! threshold. Only hexagons whose bounding boxes meet the feature's bounding
//! box are intersected.

use crate::core_types::{NodeId, SquareMeters};
use crate::grid::HexGrid;
use geo::{
    coord, Area, BooleanOps, BoundingRect, Contains, Coord, EuclideanDistance, LineString,
    MultiPolygon, Point, Polygon, Rect,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Vertices of the polygon standing in for a circular buffer
const CIRCLE_SEGMENTS: u32 = 256;

/// Hexagon matched by a projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexOverlap {
    pub node_id: NodeId,
    /// Intersection area between the feature and the hexagon
    pub area: SquareMeters,
}

/// Threshold under which an ignition buffer of `radius` still counts as inside
/// a hexagon: a full circle's area less one square unit of round-off slack
#[inline]
pub fn engulf_threshold(radius: f64) -> f64 {
    PI * radius * radius - 1.0
}

fn expand(rect: Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        coord! { x: rect.min().x - by, y: rect.min().y - by },
        coord! { x: rect.max().x + by, y: rect.max().y + by },
    )
}

fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Project one areal feature onto the grid
///
/// Returns hexagons whose intersection area with `feature` is strictly greater
/// than `threshold`, ordered by node id. Empty or off-grid features yield an
/// empty result.
pub fn project_onto_hex(feature: &MultiPolygon<f64>, grid: &HexGrid, threshold: f64) -> Vec<HexOverlap> {
    let Some(bounds) = feature.bounding_rect() else {
        return Vec::new();
    };
    let part_bounds: Vec<Option<Rect<f64>>> = feature.0.iter().map(BoundingRect::bounding_rect).collect();

    let mut matched: Vec<HexOverlap> = grid
        .candidates(bounds)
        .filter_map(|cell| {
            let cell_bounds = cell.polygon.bounding_rect()?;
            if !part_bounds
                .iter()
                .flatten()
                .any(|b| rects_overlap(b, &cell_bounds))
            {
                return None;
            }
            let hex = MultiPolygon::new(vec![cell.polygon.clone()]);
            let area = hex.intersection(feature).unsigned_area();
            (area > threshold).then_some(HexOverlap {
                node_id: cell.node_id,
                area: SquareMeters::new(area),
            })
        })
        .collect();
    matched.sort_unstable_by_key(|m| m.node_id);
    matched
}

/// Project several features (e.g. all records of one fire) onto the grid
///
/// A hexagon matches when any single feature passes the threshold; the largest
/// overlap is reported.
pub fn project_many(features: &[MultiPolygon<f64>], grid: &HexGrid, threshold: f64) -> Vec<HexOverlap> {
    let mut best: FxHashMap<NodeId, SquareMeters> = FxHashMap::default();
    for feature in features {
        for overlap in project_onto_hex(feature, grid, threshold) {
            let entry = best.entry(overlap.node_id).or_insert(overlap.area);
            if overlap.area > *entry {
                *entry = overlap.area;
            }
        }
    }
    let mut out: Vec<HexOverlap> = best
        .into_iter()
        .map(|(node_id, area)| HexOverlap { node_id, area })
        .collect();
    out.sort_unstable_by_key(|m| m.node_id);
    out
}

/// Node ids of a projection, in projection order
pub fn node_ids(overlaps: &[HexOverlap]) -> Vec<NodeId> {
    overlaps.iter().map(|m| m.node_id).collect()
}

/// Hexagons strictly containing `point` (a point on a shared edge matches none)
pub fn hexes_containing(point: Point<f64>, grid: &HexGrid) -> Vec<NodeId> {
    grid.candidates(Rect::new(point.0, point.0))
        .filter(|cell| cell.polygon.contains(&point))
        .map(|cell| cell.node_id)
        .collect()
}

/// Hexagons overlapping the exterior rings of `features` buffered by `width`
///
/// A hexagon has positive-area overlap with a ring's buffer exactly when its
/// distance to the ring is below `width`, so no buffer polygon is built.
pub fn hexes_near_boundary(features: &[MultiPolygon<f64>], grid: &HexGrid, width: f64) -> Vec<NodeId> {
    let rings: Vec<&LineString<f64>> = features
        .iter()
        .flat_map(|mp| mp.0.iter().map(Polygon::exterior))
        .collect();

    let mut out: Vec<NodeId> = Vec::new();
    for ring in rings {
        let Some(bounds) = ring.bounding_rect() else {
            continue;
        };
        for cell in grid.candidates(expand(bounds, width)) {
            if cell.polygon.euclidean_distance(ring) < width {
                out.push(cell.node_id);
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Polygon approximating a circle of `radius` around `center`
pub fn circle(center: Point<f64>, radius: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|k| {
            let angle = 2.0 * PI * f64::from(k) / f64::from(CIRCLE_SEGMENTS);
            coord! {
                x: center.x() + radius * angle.cos(),
                y: center.y() + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}
