//! Final-perimeter spread vectors and pij estimation

use super::{perimeter_of, run_per_fire, IgnitionPoints, SpreadVector, VectorRun, VectorTable};
use crate::core_types::{check_frames, Columns, Feature, FeatureCollection, FireKey, NodeId};
use crate::error::{Error, ErrorReport, FireError, Result};
use crate::grid::HexGrid;
use crate::overlay::project_many;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// How fire records are grouped into fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupBy {
    /// One fire per fire id
    #[default]
    Fire,
    /// Fire ids are nested in iterations; one fire per (iteration, fire)
    Iteration,
}

/// Options for [`generate_fire_vectors`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireVectorOptions {
    /// Minimum intersection area for a hexagon to count as burned
    pub threshold: f64,
    pub group_by: GroupBy,
    pub columns: Columns,
}

impl Default for FireVectorOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            group_by: GroupBy::Fire,
            columns: Columns::default(),
        }
    }
}

/// Vectors from each fire's ignition hexagon to every other hexagon its final
/// perimeter burned
///
/// With [`GroupBy::Fire`] the records of a fire are grouped by fire id alone;
/// the vectors still carry the iteration when all of the fire's records agree
/// on one.
///
/// # Errors
///
/// Returns [`Error::CrsMismatch`] for inconsistent reference frames and
/// attribute errors for unreadable fire or iteration columns. Per-fire
/// failures are recorded in the run's report instead.
pub fn generate_fire_vectors(
    fires: &FeatureCollection,
    ignitions: &FeatureCollection,
    grid: &HexGrid,
    options: &FireVectorOptions,
) -> Result<VectorRun> {
    let mut report = ErrorReport::new();
    check_frames(
        &[
            ("fire perimeters", fires.crs.as_ref()),
            ("ignition points", ignitions.crs.as_ref()),
            ("hexagons", grid.crs()),
        ],
        &mut report,
    )?;

    let nested = options.group_by == GroupBy::Iteration;
    let columns = &options.columns;
    let mut grouped: BTreeMap<FireKey, Vec<&Feature>> = BTreeMap::new();
    for feature in fires {
        let key = FireKey::from_feature(feature, columns, nested)?;
        grouped.entry(key).or_default().push(feature);
    }
    let mut groups: Vec<(FireKey, Vec<&Feature>)> = grouped.into_iter().collect();
    if !nested {
        for (key, records) in &mut groups {
            key.iteration = shared_iteration(records, columns)?;
        }
    }
    let points = IgnitionPoints::from_collection(ignitions, columns, nested)?;

    info!(
        "Generating final-perimeter vectors for {} fires over {} hexagons",
        groups.len(),
        grid.len()
    );

    let vectors = run_per_fire(&groups, &mut report, |key, records| {
        let perimeters = records
            .iter()
            .copied()
            .map(perimeter_of)
            .collect::<std::result::Result<Vec<_>, FireError>>()?;
        let burned = project_many(&perimeters, grid, options.threshold);
        let (ignition, _) = points.locate(key, grid)?;

        Ok(burned
            .iter()
            .filter(|hex| hex.node_id != ignition)
            .map(|hex| SpreadVector::new(ignition, hex.node_id, key))
            .collect())
    });

    info!(
        "Generated {} vectors, {} fires skipped",
        vectors.len(),
        report.fire_errors.len()
    );
    Ok(VectorRun {
        vectors: VectorTable::new(vectors),
        report,
    })
}

/// Iteration common to every record of a fire, if the column is present and
/// uniform
fn shared_iteration(records: &[&Feature], columns: &Columns) -> Result<Option<i64>> {
    let mut shared = None;
    for record in records {
        match (record.int_opt(&columns.iteration)?, shared) {
            (None, _) => return Ok(None),
            (Some(iteration), None) => shared = Some(iteration),
            (Some(iteration), Some(seen)) if iteration != seen => return Ok(None),
            _ => {}
        }
    }
    Ok(shared)
}

/// Empirical spread probability between two hexagons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PijRow {
    pub origin: NodeId,
    pub destination: NodeId,
    pub firecount: u32,
    /// `firecount / iterations`, rounded to 5 decimals
    pub pij: f64,
    /// `pij` with exactly 5 decimals
    pub pij_text: String,
}

/// Count vectors per (destination, origin) pair and normalise by `iterations`
///
/// Self pairs are dropped. Rows are ordered by ascending firecount; ties keep
/// (destination, origin) order.
///
/// # Errors
///
/// Returns [`Error::InvalidIterations`] when `iterations` is zero.
pub fn pij_from_vectors(vectors: &VectorTable, iterations: u32) -> Result<Vec<PijRow>> {
    if iterations == 0 {
        return Err(Error::InvalidIterations(iterations));
    }

    let mut counts: FxHashMap<(NodeId, NodeId), u32> = FxHashMap::default();
    for v in vectors.iter().filter(|v| !v.is_self_loop()) {
        *counts.entry((v.destination, v.origin)).or_insert(0) += 1;
    }

    let mut pairs: Vec<((NodeId, NodeId), u32)> = counts.into_iter().collect();
    pairs.sort_unstable_by_key(|(pair, _)| *pair);
    pairs.sort_by_key(|(_, count)| *count);

    Ok(pairs
        .into_iter()
        .map(|((destination, origin), firecount)| {
            let pij = round5(f64::from(firecount) / f64::from(iterations));
            PijRow {
                origin,
                destination,
                firecount,
                pij,
                pij_text: format!("{pij:.5}"),
            }
        })
        .collect())
}

fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}
