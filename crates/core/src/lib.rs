//! Fire Spread Core Library
//!
//! Post-processing for stochastic wildfire simulation output. Fire perimeters
//! and ignition points are projected onto a hexagonal patch network and
//! summarised as spread vectors between hexagons.
//!
//! ## Pipeline
//!
//! - Tessellation: hexagon grid, centroid nodes and adjacency arcs over an extent
//! - Overlay: projection of perimeters and points onto the grid
//! - Spread vectors: ignition-to-burned vectors from final perimeters, or
//!   leading-edge vectors from daily progression
//! - Aggregation: burn and ignition probability, pij, source-sink ratio,
//!   firesheds and fireplains
//! - Directional profile: bearing/magnitude rows for spread roses
//!
//! Loading and writing feature files is left to the caller; everything here
//! works on in-memory [`FeatureCollection`]s.

// Core types and utilities
pub mod core_types;
pub mod error;

// Tessellation and overlay
pub mod grid;
pub mod overlay;

// Vector generation and summaries
pub mod aggregate;
pub mod rose;
pub mod vectors;

// Re-export core types
pub use core_types::{AttrValue, Columns, Crs, Extent, Feature, FeatureCollection, FireKey, NodeId};
pub use core_types::{Degrees, Hectares, SquareMeters};
pub use error::{Error, ErrorReport, FireError, Result};

// Re-export pipeline entry points
pub use aggregate::{
    burn_probability, fireplain, fireshed, ignition_probability, source_sink_ratio, AreaOfConcernOptions,
    BurnProbabilityOptions, HexProbability, ProbabilityRun, Shed, SourceSinkRow,
};
pub use grid::{build_arcs, build_hex_grid, build_hex_grid_only, centroids_of, ArcSet, CellSize, HexGrid, NodeSet};
pub use overlay::{project_onto_hex, HexOverlap};
pub use rose::{build_rose_input, pij_lines, rose_sectors, RoseRow, RoseWeight};
pub use vectors::{
    compute_angles, generate_daily_vectors, generate_fire_vectors, pij_from_vectors, select_sector, AngleRun,
    DailyVectorOptions, FireVectorOptions, GroupBy, PijRow, SpreadVector, VectorRun, VectorTable,
};
