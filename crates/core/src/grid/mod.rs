//! Tessellation builder: hexagon grid, centroid nodes and adjacency arcs

pub mod arcs;
pub mod hex_grid;

// Re-export main types
pub use arcs::{build_arcs, Arc, ArcSet};
pub use hex_grid::{
    build_hex_grid, build_hex_grid_for, build_hex_grid_only, centroids_of, hex_side, hexagon,
    CellSize, HexCell, HexGrid, Node, NodeSet,
};
