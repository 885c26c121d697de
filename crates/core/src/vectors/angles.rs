//! Spread angles relative to the ignition point
//!
//! The angle of a vector `origin → destination` is measured at the ignition
//! point, from the bearing of the origin to the bearing of the destination.
//! 180° means the fire kept going straight away from the ignition.

use super::{SpreadVector, VectorTable, FINAL_EXTENT_DAY};
use crate::core_types::{Degrees, FireKey, NodeId};
use crate::error::{Error, Result};
use crate::grid::NodeSet;
use geo::Point;
use nalgebra::Vector2;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Angle given to the ignition-to-final-extent batch
pub const FINAL_EXTENT_ANGLE: f64 = 361.0;

/// Angle given to vectors whose angle is undefined (day 1, degenerate geometry)
pub const STRAIGHT_BACK_ANGLE: f64 = 181.0;

/// Spread vector with its angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngledVector {
    pub vector: SpreadVector,
    pub angle: Degrees,
}

/// Output of [`compute_angles`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleRun {
    pub rows: Vec<AngledVector>,
    /// Rows that fell back to [`STRAIGHT_BACK_ANGLE`] because a node was
    /// missing or a leg had zero length
    pub degenerate: usize,
}

enum Outcome {
    Angle(Degrees),
    Degenerate,
}

fn to_vector(p: Point<f64>) -> Vector2<f64> {
    Vector2::new(p.x(), p.y())
}

/// Angle at `pivot` from the bearing of `origin` to the bearing of `destination`
fn beta(pivot: Vector2<f64>, origin: Vector2<f64>, destination: Vector2<f64>) -> Option<Degrees> {
    let to_origin = origin - pivot;
    let to_destination = destination - pivot;
    if to_origin.norm() == 0.0 || to_destination.norm() == 0.0 {
        return None;
    }
    let deg1 = *Degrees::bearing(to_origin.x, to_origin.y);
    let deg2 = *Degrees::bearing(to_destination.x, to_destination.y);
    let angle = if deg1 <= deg2 {
        deg2 - deg1
    } else {
        360.0 - (deg1 - deg2)
    };
    Some(Degrees::new(angle))
}

fn angle_of(vector: &SpreadVector, nodes: &NodeSet) -> Outcome {
    match vector.day {
        Some(FINAL_EXTENT_DAY) => return Outcome::Angle(Degrees::new(FINAL_EXTENT_ANGLE)),
        Some(1) => return Outcome::Angle(Degrees::new(STRAIGHT_BACK_ANGLE)),
        _ => {}
    }
    let lookup = |id: Option<NodeId>| id.and_then(|id| nodes.point(id)).map(to_vector);
    let (Some(pivot), Some(origin), Some(destination)) = (
        lookup(vector.ignition),
        lookup(Some(vector.origin)),
        lookup(Some(vector.destination)),
    ) else {
        return Outcome::Degenerate;
    };
    beta(pivot, origin, destination).map_or(Outcome::Degenerate, Outcome::Angle)
}

/// Attach an angle to every daily vector
///
/// Day-999 rows get 361 and day-1 rows get 181. Rows are deduplicated on
/// (day, destination, fire, ignition, origin), keeping the first.
pub fn compute_angles(vectors: &VectorTable, nodes: &NodeSet) -> AngleRun {
    let outcomes: Vec<Outcome> = vectors
        .rows()
        .par_iter()
        .map(|v| angle_of(v, nodes))
        .collect();

    let mut seen: FxHashSet<(Option<u32>, NodeId, FireKey, Option<NodeId>, NodeId)> = FxHashSet::default();
    let mut run = AngleRun::default();
    for (vector, outcome) in vectors.iter().zip(outcomes) {
        if !seen.insert((vector.day, vector.destination, vector.fire, vector.ignition, vector.origin)) {
            continue;
        }
        let angle = match outcome {
            Outcome::Angle(angle) => angle,
            Outcome::Degenerate => {
                run.degenerate += 1;
                Degrees::new(STRAIGHT_BACK_ANGLE)
            }
        };
        run.rows.push(AngledVector {
            vector: *vector,
            angle,
        });
    }
    debug!(
        "Computed {} angles, {} degenerate",
        run.rows.len(),
        run.degenerate
    );
    run
}

/// Keep vectors within a symmetric sector of `alpha` degrees around 180°
///
/// The result is ordered by (fire, day); rows of equal key keep their order.
///
/// # Errors
///
/// Returns [`Error::InvalidAngle`] when `alpha` is outside `0..=360`.
pub fn select_sector(rows: &[AngledVector], alpha: f64) -> Result<Vec<AngledVector>> {
    if !(0.0..=360.0).contains(&alpha) {
        return Err(Error::InvalidAngle(alpha));
    }
    let min_angle = 180.0 - alpha / 2.0;
    let max_angle = 180.0 + alpha / 2.0;

    let mut kept: Vec<AngledVector> = rows
        .iter()
        .filter(|row| *row.angle >= min_angle && *row.angle <= max_angle)
        .copied()
        .collect();
    kept.sort_by_key(|row| (row.vector.fire, row.vector.day));
    Ok(kept)
}
