//! Directional spread profile
//!
//! Turns pij rows into bearing/magnitude records for a rose diagram. Bearings
//! point from the destination back towards the origin, clockwise from north,
//! so a rose reads as "where fire comes from".

use crate::core_types::{Degrees, NodeId};
use crate::grid::NodeSet;
use crate::vectors::PijRow;
use geo::{EuclideanLength, Line, Point};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Straight line between the centroids of a pij pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PijLine {
    pub origin: NodeId,
    pub destination: NodeId,
    pub pij: f64,
    pub line: Line<f64>,
}

/// One rose diagram input record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoseRow {
    pub origin: NodeId,
    pub destination: NodeId,
    pub pij: f64,
    pub angle: Degrees,
    /// Centroid distance between origin and destination
    pub length: f64,
    /// `pij · length`
    pub weighted: f64,
}

/// Value accumulated per rose sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoseWeight {
    #[default]
    Pij,
    Length,
    Weighted,
}

/// One sector of a binned rose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoseSector {
    /// Sector centre bearing
    pub center: Degrees,
    /// Share of the total weight, in percent
    pub percent: f64,
}

/// Bearing of `origin` as seen from `destination`
pub fn source_bearing(origin: Point<f64>, destination: Point<f64>) -> Degrees {
    Degrees::bearing(origin.x() - destination.x(), origin.y() - destination.y())
}

fn endpoints(row: &PijRow, nodes: &NodeSet) -> Option<(Point<f64>, Point<f64>)> {
    match (nodes.point(row.origin), nodes.point(row.destination)) {
        (Some(o), Some(d)) => Some((o, d)),
        _ => {
            warn!(
                "Pair {} -> {} has no centroid, skipping it",
                row.origin, row.destination
            );
            None
        }
    }
}

/// Line features for pij rows
pub fn pij_lines(rows: &[PijRow], nodes: &NodeSet) -> Vec<PijLine> {
    rows.iter()
        .filter_map(|row| {
            let (o, d) = endpoints(row, nodes)?;
            Some(PijLine {
                origin: row.origin,
                destination: row.destination,
                pij: row.pij,
                line: Line::new(o, d),
            })
        })
        .collect()
}

/// Angle, length and weighted magnitude of every pij row with known centroids
pub fn build_rose_input(rows: &[PijRow], nodes: &NodeSet) -> Vec<RoseRow> {
    rows.iter()
        .filter_map(|row| {
            let (o, d) = endpoints(row, nodes)?;
            let length = Line::new(o, d).euclidean_length();
            Some(RoseRow {
                origin: row.origin,
                destination: row.destination,
                pij: row.pij,
                angle: source_bearing(o, d),
                length,
                weighted: row.pij * length,
            })
        })
        .collect()
}

/// Bin rose rows into `sectors` equal sectors, the first centred on north
///
/// Shares are normalised to percent of the total weight. An empty or
/// weightless input gives all-zero sectors.
pub fn rose_sectors(rows: &[RoseRow], sectors: usize, weight: RoseWeight) -> Vec<RoseSector> {
    if sectors == 0 {
        return Vec::new();
    }
    let width = 360.0 / sectors as f64;
    let mut totals = vec![0.0; sectors];
    for row in rows {
        let value = match weight {
            RoseWeight::Pij => row.pij,
            RoseWeight::Length => row.length,
            RoseWeight::Weighted => row.weighted,
        };
        let shifted = (*row.angle + width / 2.0).rem_euclid(360.0);
        let bin = ((shifted / width) as usize).min(sectors - 1);
        totals[bin] += value;
    }

    let sum: f64 = totals.iter().sum();
    totals
        .into_iter()
        .enumerate()
        .map(|(i, total)| RoseSector {
            center: Degrees::new(i as f64 * width),
            percent: if sum > 0.0 { total / sum * 100.0 } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Node;
    use approx::assert_relative_eq;

    fn nodes() -> NodeSet {
        let at = |id: u32, x: f64, y: f64| Node {
            id: NodeId(id),
            point: Point::new(x, y),
        };
        NodeSet::new(None, vec![at(1, 0.0, 0.0), at(2, 0.0, 30.0), at(3, 40.0, 0.0)])
    }

    fn pij(origin: u32, destination: u32, pij: f64) -> PijRow {
        PijRow {
            origin: NodeId(origin),
            destination: NodeId(destination),
            firecount: 1,
            pij,
            pij_text: format!("{pij:.5}"),
        }
    }

    #[test]
    fn test_rose_input() {
        let rows = build_rose_input(&[pij(1, 2, 0.5), pij(3, 1, 0.25)], &nodes());
        assert_eq!(rows.len(), 2);
        // spread northwards: the origin lies due south of the destination
        assert_relative_eq!(*rows[0].angle, 180.0, epsilon = 1e-9);
        assert_relative_eq!(rows[0].length, 30.0);
        assert_relative_eq!(rows[0].weighted, 15.0);
        // spread westwards: origin due east
        assert_relative_eq!(*rows[1].angle, 90.0, epsilon = 1e-9);
        assert_relative_eq!(rows[1].weighted, 10.0);
    }

    #[test]
    fn test_missing_nodes_are_skipped() {
        let rows = [pij(1, 2, 0.5), pij(1, 42, 0.5)];
        assert_eq!(build_rose_input(&rows, &nodes()).len(), 1);
        let lines = pij_lines(&rows, &nodes());
        assert_eq!(lines.len(), 1);
        assert_relative_eq!(lines[0].line.euclidean_length(), 30.0);
    }

    #[test]
    fn test_rose_sectors() {
        let rows = build_rose_input(&[pij(1, 2, 0.75), pij(3, 1, 0.25)], &nodes());
        let bins = rose_sectors(&rows, 4, RoseWeight::Pij);
        assert_eq!(bins.len(), 4);
        assert_relative_eq!(bins[1].percent, 25.0);
        assert_relative_eq!(bins[2].percent, 75.0);
        assert_relative_eq!(*bins[2].center, 180.0);
        let total: f64 = bins.iter().map(|b| b.percent).sum();
        assert_relative_eq!(total, 100.0);
        assert!(rose_sectors(&rows, 0, RoseWeight::Length).is_empty());
    }

    #[test]
    fn test_near_north_wraps_into_first_sector() {
        let mut row = build_rose_input(&[pij(1, 2, 1.0)], &nodes())[0];
        row.angle = Degrees::new(359.0);
        let bins = rose_sectors(&[row], 8, RoseWeight::Length);
        assert_relative_eq!(bins[0].percent, 100.0);
    }
}
