//! Identifier types shared across the pipeline

use crate::core_types::columns::Columns;
use crate::core_types::feature::Feature;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hexagon / node identifier, 1-based in grid generation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Identifier of the hexagon at zero-based generation index `index`
    #[inline]
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32 + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fire identity, optionally nested in a simulation iteration
///
/// Ordering is by fire id, then iteration; merged per-fire output follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FireKey {
    pub fire: i64,
    pub iteration: Option<i64>,
}

impl FireKey {
    pub fn new(fire: i64) -> Self {
        Self {
            fire,
            iteration: None,
        }
    }

    pub fn with_iteration(fire: i64, iteration: i64) -> Self {
        Self {
            fire,
            iteration: Some(iteration),
        }
    }

    /// Read the key of a fire or ignition record
    ///
    /// The iteration column is only read when `nested` is set.
    ///
    /// # Errors
    ///
    /// Fails when the fire column (or, if nested, the iteration column) is
    /// missing or not an integer.
    pub fn from_feature(feature: &Feature, columns: &Columns, nested: bool) -> Result<Self> {
        let fire = feature.int(&columns.fire, "fire record")?;
        let iteration = if nested {
            Some(feature.int(&columns.iteration, "fire record")?)
        } else {
            None
        };
        Ok(Self { fire, iteration })
    }

    /// Same fire, treating a missing iteration on either side as a wildcard
    pub fn matches(&self, other: &FireKey) -> bool {
        self.fire == other.fire
            && match (self.iteration, other.iteration) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl fmt::Display for FireKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.iteration {
            Some(iteration) => write!(f, "{} (iteration {})", self.fire, iteration),
            None => write!(f, "{}", self.fire),
        }
    }
}
