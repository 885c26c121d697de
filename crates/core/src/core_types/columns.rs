//! Column-name configuration
//!
//! Upstream simulators name their attribute columns differently. Every
//! operation that reads attributes takes a `Columns` value instead of renaming
//! columns on the caller's collections.

use serde::{Deserialize, Serialize};

/// Attribute column names read by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    /// Hexagon / node identifier
    pub node_id: String,
    /// Fire identifier
    pub fire: String,
    /// Iteration (simulation run) identifier
    pub iteration: String,
    /// Day ordinal of a daily progression perimeter
    pub day: String,
    /// Origin hexagon of a spread vector (hexagon i)
    pub origin: String,
    /// Destination hexagon of a spread vector (hexagon j)
    pub destination: String,
    /// Ignition point x coordinate
    pub x: String,
    /// Ignition point y coordinate
    pub y: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            node_id: "NodeID".to_owned(),
            fire: "fire".to_owned(),
            iteration: "iteration".to_owned(),
            day: "day".to_owned(),
            origin: "column_i".to_owned(),
            destination: "column_j".to_owned(),
            x: "x_coord".to_owned(),
            y: "y_coord".to_owned(),
        }
    }
}

impl Columns {
    pub fn with_node_id(mut self, name: impl Into<String>) -> Self {
        self.node_id = name.into();
        self
    }

    pub fn with_fire(mut self, name: impl Into<String>) -> Self {
        self.fire = name.into();
        self
    }

    pub fn with_iteration(mut self, name: impl Into<String>) -> Self {
        self.iteration = name.into();
        self
    }

    pub fn with_day(mut self, name: impl Into<String>) -> Self {
        self.day = name.into();
        self
    }

    pub fn with_origin(mut self, name: impl Into<String>) -> Self {
        self.origin = name.into();
        self
    }

    pub fn with_destination(mut self, name: impl Into<String>) -> Self {
        self.destination = name.into();
        self
    }

    pub fn with_xy(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x = x.into();
        self.y = y.into();
        self
    }
}
