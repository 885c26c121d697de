//! Core types and utilities

pub mod columns;
pub mod feature;
pub mod ids;
pub mod spatial;
pub mod units;

pub use columns::Columns;
pub use feature::{
    check_frames, polygons_of, AttrValue, Attributes, Crs, Extent, Feature, FeatureCollection,
};
pub use ids::{FireKey, NodeId};
pub use spatial::SpatialIndex;
pub use units::{Degrees, Hectares, SquareMeters};
