//! Adjacency arcs between touching hexagons
//!
//! Two hexagons are adjacent when their polygons are not disjoint. Candidate
//! pairs come from the grid's bounding-box index instead of an all-pairs scan;
//! the exact test is a polygon distance within a small fraction of the side
//! length, which absorbs round-off between vertices generated from different
//! centres.

use crate::core_types::NodeId;
use crate::grid::hex_grid::{centroids_of, HexGrid};
use geo::{coord, BoundingRect, EuclideanDistance, Line, Rect};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Relative tolerance for "touching"
const TOUCH_TOLERANCE: f64 = 1e-6;

/// Adjacency edge between two hexagon centroids
///
/// Stored once per undirected edge with `node_1 < node_2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub node_1: NodeId,
    pub node_2: NodeId,
    pub line: Line<f64>,
}

/// All arcs of a grid, sorted by `(node_1, node_2)`
#[derive(Debug, Clone, Default)]
pub struct ArcSet {
    arcs: Vec<Arc>,
}

impl ArcSet {
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc> {
        self.arcs.iter()
    }

    /// True if `a` and `b` share an arc, in either order
    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        let key = if a < b { (a, b) } else { (b, a) };
        self.arcs
            .binary_search_by(|arc| (arc.node_1, arc.node_2).cmp(&key))
            .is_ok()
    }

    /// Neighbours of `node`, ascending
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .arcs
            .iter()
            .filter_map(|arc| {
                if arc.node_1 == node {
                    Some(arc.node_2)
                } else if arc.node_2 == node {
                    Some(arc.node_1)
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable();
        out
    }
}

impl<'a> IntoIterator for &'a ArcSet {
    type Item = &'a Arc;
    type IntoIter = std::slice::Iter<'a, Arc>;

    fn into_iter(self) -> Self::IntoIter {
        self.arcs.iter()
    }
}

/// Generate arcs between every pair of touching hexagons
pub fn build_arcs(grid: &HexGrid) -> ArcSet {
    let nodes = centroids_of(grid);
    let tolerance = TOUCH_TOLERANCE * grid.side();

    let mut arcs: Vec<Arc> = grid
        .cells()
        .par_iter()
        .flat_map_iter(|cell| {
            let mut found = Vec::new();
            let Some(bounds) = cell.polygon.bounding_rect() else {
                return found;
            };
            let search = Rect::new(
                coord! { x: bounds.min().x - tolerance, y: bounds.min().y - tolerance },
                coord! { x: bounds.max().x + tolerance, y: bounds.max().y + tolerance },
            );
            for other in grid.candidates(search) {
                // each undirected edge is emitted by its lower id
                if other.node_id <= cell.node_id {
                    continue;
                }
                if cell.polygon.euclidean_distance(&other.polygon) > tolerance {
                    continue;
                }
                if let (Some(a), Some(b)) = (nodes.point(cell.node_id), nodes.point(other.node_id)) {
                    found.push(Arc {
                        node_1: cell.node_id,
                        node_2: other.node_id,
                        line: Line::new(a, b),
                    });
                }
            }
            found
        })
        .collect();

    arcs.sort_unstable_by_key(|arc| (arc.node_1, arc.node_2));
    info!("Generated {} arcs for {} hexagons", arcs.len(), grid.len());
    ArcSet { arcs }
}
