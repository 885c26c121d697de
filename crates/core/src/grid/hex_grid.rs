//! Hexagonal tessellation of a planar extent
//!
//! Generates a lattice of hexagon centres covering an axis-aligned extent and
//! the hexagon polygon around each centre. Columns are `1.5·side` apart and
//! every other column is shifted by half a row so neighbouring columns
//! interlock. Hexagon vertices sit at 0°, 60°, …, 300° from the centre.

use crate::core_types::{
    AttrValue, Columns, Crs, Extent, Feature, FeatureCollection, NodeId, SpatialIndex,
};
use crate::error::{Error, Result};
use geo::{coord, Area, BoundingRect, Centroid, Coord, LineString, Point, Polygon, Rect};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{info, warn};

/// √3 · 3 / 2, area of a unit-side hexagon
const UNIT_HEX_AREA: f64 = 2.598_076_211_353_316;

/// Hexagon size, given in any one of three equivalent forms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellSize {
    /// Hexagon area
    Area(f64),
    /// Side length (equal to the circumradius)
    Side(f64),
    /// Long diagonal, vertex to opposite vertex
    Diameter(f64),
}

impl CellSize {
    /// Canonical hexagon area
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCellSize`] for a non-finite or non-positive size.
    pub fn to_area(self) -> Result<f64> {
        let (kind, value) = match self {
            CellSize::Area(a) => ("area", a),
            CellSize::Side(s) => ("side", s),
            CellSize::Diameter(d) => ("diameter", d),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidCellSize { kind, value });
        }
        Ok(match self {
            CellSize::Area(a) => a,
            CellSize::Side(s) => s * s * 3.0 / 2.0 * 3f64.sqrt(),
            CellSize::Diameter(d) => d * d * 3.0 / 8.0 * 3f64.sqrt(),
        })
    }

    /// Side length of the hexagon
    ///
    /// # Errors
    ///
    /// Same as [`CellSize::to_area`].
    pub fn side(self) -> Result<f64> {
        Ok(hex_side(self.to_area()?))
    }
}

/// Side length of a regular hexagon with the given area
#[inline]
pub fn hex_side(area: f64) -> f64 {
    3f64.powf(0.25) * (2.0 * area / 9.0).sqrt()
}

/// One tessellation cell
#[derive(Debug, Clone, PartialEq)]
pub struct HexCell {
    pub node_id: NodeId,
    pub polygon: Polygon<f64>,
}

/// Immutable hexagon grid with a bounding-box index
#[derive(Debug, Clone)]
pub struct HexGrid {
    crs: Option<Crs>,
    side: f64,
    cells: Vec<HexCell>,
    positions: FxHashMap<NodeId, usize>,
    index: SpatialIndex,
}

impl HexGrid {
    /// Assemble a grid from cells; `side` is the nominal hexagon side length
    pub fn new(crs: Option<Crs>, side: f64, cells: Vec<HexCell>) -> Self {
        let bounds: Vec<Option<Rect<f64>>> = cells.iter().map(|c| c.polygon.bounding_rect()).collect();
        let origin = bounds
            .iter()
            .flatten()
            .map(|r| r.min())
            .reduce(|a, b| coord! { x: a.x.min(b.x), y: a.y.min(b.y) })
            .unwrap_or(coord! { x: 0.0, y: 0.0 });
        let bucket = if side.is_finite() && side > 0.0 { 2.0 * side } else { 1.0 };

        let mut index = SpatialIndex::new(origin, bucket);
        let mut positions = FxHashMap::default();
        for (i, (cell, rect)) in cells.iter().zip(&bounds).enumerate() {
            positions.insert(cell.node_id, i);
            if let Some(rect) = rect {
                index.insert(i as u32, *rect);
            }
        }

        Self {
            crs,
            side,
            cells,
            positions,
            index,
        }
    }

    /// Adopt an externally supplied hexagon collection
    ///
    /// Node ids are read from `columns.node_id`. The nominal side length is
    /// derived from the area of the first cell.
    ///
    /// # Errors
    ///
    /// Fails when a record lacks a readable node id or is not a polygon.
    pub fn from_features(collection: &FeatureCollection, columns: &Columns) -> Result<Self> {
        let mut cells = Vec::with_capacity(collection.len());
        for feature in collection {
            let id = feature.int(&columns.node_id, "hexagon record")?;
            let id = u32::try_from(id).map_err(|_| Error::InvalidAttribute {
                column: columns.node_id.clone(),
                value: id.to_string(),
                expected: "a positive node id",
            })?;
            let Some(polygon) = feature.polygons().and_then(|p| p.into_iter().next()) else {
                return Err(Error::InvalidAttribute {
                    column: "geometry".to_owned(),
                    value: format!("node {id}"),
                    expected: "a polygon",
                });
            };
            cells.push(HexCell {
                node_id: NodeId(id),
                polygon,
            });
        }
        let side = cells
            .first()
            .map_or(1.0, |c| hex_side(c.polygon.unsigned_area()));
        Ok(Self::new(collection.crs.clone(), side, cells))
    }

    /// Export as a feature collection with a node id column
    pub fn to_features(&self, columns: &Columns) -> FeatureCollection {
        FeatureCollection::with_features(
            self.crs.clone(),
            self.cells
                .iter()
                .map(|c| {
                    Feature::new(c.polygon.clone())
                        .with(&columns.node_id, AttrValue::Int(i64::from(c.node_id.0)))
                })
                .collect(),
        )
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Nominal hexagon side length
    pub fn side(&self) -> f64 {
        self.side
    }

    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell with the given id
    pub fn cell(&self, node_id: NodeId) -> Option<&HexCell> {
        self.positions.get(&node_id).map(|&i| &self.cells[i])
    }

    /// Cells whose bounding boxes may intersect `bounds`, in generation order
    pub fn candidates(&self, bounds: Rect<f64>) -> impl Iterator<Item = &HexCell> + '_ {
        self.index
            .query_rect(bounds)
            .into_iter()
            .map(move |i| &self.cells[i as usize])
    }
}

/// Hexagon centroid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub point: Point<f64>,
}

/// One centroid per hexagon, sharing the hexagon's id
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    crs: Option<Crs>,
    nodes: Vec<Node>,
    positions: FxHashMap<NodeId, usize>,
}

impl NodeSet {
    pub fn new(crs: Option<Crs>, nodes: Vec<Node>) -> Self {
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        Self {
            crs,
            nodes,
            positions,
        }
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Centroid of a node
    pub fn point(&self, node_id: NodeId) -> Option<Point<f64>> {
        self.positions.get(&node_id).map(|&i| self.nodes[i].point)
    }

    /// Export as point features with a node id column
    pub fn to_features(&self, columns: &Columns) -> FeatureCollection {
        FeatureCollection::with_features(
            self.crs.clone(),
            self.nodes
                .iter()
                .map(|n| {
                    Feature::new(n.point)
                        .with(&columns.node_id, AttrValue::Int(i64::from(n.id.0)))
                })
                .collect(),
        )
    }
}

/// Lattice centres covering `extent`, column-major with y increasing
///
/// The first column sits one pitch at or before `xmin` and columns continue
/// until one pitch past `xmax`; rows likewise in y. Column phase alternates
/// between the two row starts, seeded by the parity of the first column's
/// global index.
fn lattice_centers(side: f64, extent: &Extent) -> Vec<Coord<f64>> {
    let v_step = 3f64.sqrt() * side;
    let h_step = 1.5 * side;

    let h_skip = (extent.xmin / h_step).ceil() - 1.0;
    let h_start = h_skip * h_step;
    let v_skip = (extent.ymin / v_step).ceil() - 1.0;
    let v_start = v_skip * v_step;

    let h_end = extent.xmax + h_step;
    let v_end = extent.ymax + v_step;

    let row_starts = if v_start - v_step / 2.0 < extent.ymin {
        [v_start + v_step / 2.0, v_start]
    } else {
        [v_start - v_step / 2.0, v_start]
    };
    let first_phase = (h_skip as i64).rem_euclid(2) as usize;

    let mut centers = Vec::new();
    let mut column = 0usize;
    loop {
        let x = h_start + column as f64 * h_step;
        if x >= h_end {
            break;
        }
        let y0 = row_starts[(first_phase + column) % 2];
        let mut row = 0usize;
        loop {
            let y = y0 + row as f64 * v_step;
            if y >= v_end {
                break;
            }
            centers.push(coord! { x: x, y: y });
            row += 1;
        }
        column += 1;
    }
    centers
}

/// Regular hexagon of the given side around `center`
pub fn hexagon(center: Coord<f64>, side: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..6)
        .map(|k| {
            let angle = f64::from(k) * PI / 3.0;
            coord! {
                x: center.x + angle.cos() * side,
                y: center.y + angle.sin() * side,
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Build the hexagon grid and its centroid nodes over `extent`
///
/// # Errors
///
/// Returns [`Error::InvalidExtent`] or [`Error::InvalidCellSize`] for unusable
/// inputs.
pub fn build_hex_grid(
    extent: Extent,
    cell_size: CellSize,
    crs: Option<Crs>,
) -> Result<(HexGrid, NodeSet)> {
    extent.validate()?;
    let side = cell_size.side()?;
    let centers = lattice_centers(side, &extent);

    let mut cells = Vec::with_capacity(centers.len());
    let mut nodes = Vec::with_capacity(centers.len());
    for (i, center) in centers.iter().enumerate() {
        let node_id = NodeId::from_index(i);
        cells.push(HexCell {
            node_id,
            polygon: hexagon(*center, side),
        });
        nodes.push(Node {
            id: node_id,
            point: Point::from(*center),
        });
    }

    info!(
        "Generated {} hexagons (side {:.3}, area {:.3}) over extent ({:.1}, {:.1}, {:.1}, {:.1})",
        cells.len(),
        side,
        side * side * UNIT_HEX_AREA,
        extent.xmin,
        extent.ymin,
        extent.xmax,
        extent.ymax
    );

    Ok((
        HexGrid::new(crs.clone(), side, cells),
        NodeSet::new(crs, nodes),
    ))
}

/// Build only the hexagon polygons over `extent`
///
/// # Errors
///
/// Same as [`build_hex_grid`].
pub fn build_hex_grid_only(extent: Extent, cell_size: CellSize, crs: Option<Crs>) -> Result<HexGrid> {
    build_hex_grid(extent, cell_size, crs).map(|(grid, _)| grid)
}

/// Build a grid over the total bounds of `collection`, in its reference frame
///
/// # Errors
///
/// Returns [`Error::InvalidExtent`] for an empty collection, otherwise the
/// same as [`build_hex_grid`].
pub fn build_hex_grid_for(
    collection: &FeatureCollection,
    cell_size: CellSize,
) -> Result<(HexGrid, NodeSet)> {
    let extent = collection.total_bounds().ok_or(Error::InvalidExtent {
        xmin: f64::NAN,
        ymin: f64::NAN,
        xmax: f64::NAN,
        ymax: f64::NAN,
    })?;
    build_hex_grid(extent, cell_size, collection.crs.clone())
}

/// Geometric centroid of every hexagon, preserving node ids
pub fn centroids_of(grid: &HexGrid) -> NodeSet {
    let nodes = grid
        .cells()
        .iter()
        .filter_map(|cell| match cell.polygon.centroid() {
            Some(point) => Some(Node {
                id: cell.node_id,
                point,
            }),
            None => {
                warn!("Hexagon {} has no centroid, skipping node", cell.node_id);
                None
            }
        })
        .collect();
    NodeSet::new(grid.crs().cloned(), nodes)
}
