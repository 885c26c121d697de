//! Spread vector rows and tabular import

use crate::core_types::{AttrValue, Columns, FireKey, NodeId};
use crate::error::{Error, ErrorReport, Result};
use serde::{Deserialize, Serialize};

/// Day tag of the ignition-to-final-extent reference batch
pub const FINAL_EXTENT_DAY: u32 = 999;

/// Directed hexagon-to-hexagon spread observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpreadVector {
    pub origin: NodeId,
    pub destination: NodeId,
    pub fire: FireKey,
    /// Spread day; `None` for final-perimeter vectors
    pub day: Option<u32>,
    /// Ignition hexagon of the fire; set by the daily generator
    pub ignition: Option<NodeId>,
}

impl SpreadVector {
    pub fn new(origin: NodeId, destination: NodeId, fire: FireKey) -> Self {
        Self {
            origin,
            destination,
            fire,
            day: None,
            ignition: None,
        }
    }

    pub fn on_day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn with_ignition(mut self, ignition: NodeId) -> Self {
        self.ignition = Some(ignition);
        self
    }

    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.origin == self.destination
    }
}

/// Ordered collection of spread vectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorTable {
    rows: Vec<SpreadVector>,
}

impl VectorTable {
    pub fn new(rows: Vec<SpreadVector>) -> Self {
        Self { rows }
    }

    /// Import an external 3-column (`origin, destination, fire`) or 4-column
    /// (`+ day`) table
    ///
    /// Each role is first located by its name in `columns`. Roles whose name
    /// is absent take the remaining header positions left to right, in the
    /// order above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for a header of the wrong width, a row of a
    /// different width, or two roles resolving to one column, and
    /// [`Error::InvalidAttribute`] for cells that are not valid ids or days.
    pub fn from_rows(header: &[&str], rows: &[Vec<AttrValue>], columns: &Columns) -> Result<Self> {
        let schema_error = |found: usize| Error::Schema {
            found,
            origin: columns.origin.clone(),
            destination: columns.destination.clone(),
            fire: columns.fire.clone(),
            day: columns.day.clone(),
        };
        if !(3..=4).contains(&header.len()) {
            return Err(schema_error(header.len()));
        }

        let roles = [&columns.origin, &columns.destination, &columns.fire, &columns.day];
        let mut slots: Vec<Option<usize>> = roles[..header.len()]
            .iter()
            .map(|name| header.iter().position(|h| h == name))
            .collect();
        let unused: Vec<usize> = (0..header.len())
            .filter(|at| !slots.contains(&Some(*at)))
            .collect();
        let mut unused = unused.into_iter();
        for slot in slots.iter_mut().filter(|slot| slot.is_none()) {
            *slot = unused.next();
        }
        let resolved: Vec<usize> = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| schema_error(header.len()))?;
        let mut distinct = resolved.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != resolved.len() {
            return Err(schema_error(header.len()));
        }
        let (origin_at, destination_at, fire_at) = (resolved[0], resolved[1], resolved[2]);
        let day_at = resolved.get(3).copied();

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != header.len() {
                return Err(schema_error(row.len()));
            }
            let mut vector = SpreadVector::new(
                node_cell(&row[origin_at], &columns.origin)?,
                node_cell(&row[destination_at], &columns.destination)?,
                FireKey::new(int_cell(&row[fire_at], &columns.fire)?),
            );
            if let Some(at) = day_at {
                let day = int_cell(&row[at], &columns.day)?;
                vector.day = Some(u32::try_from(day).map_err(|_| Error::InvalidAttribute {
                    column: columns.day.clone(),
                    value: day.to_string(),
                    expected: "a non-negative day",
                })?);
            }
            out.push(vector);
        }
        Ok(Self { rows: out })
    }

    pub fn rows(&self) -> &[SpreadVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpreadVector> {
        self.rows.iter()
    }

    /// Distinct fires present, ascending
    pub fn fires(&self) -> Vec<FireKey> {
        let mut keys: Vec<FireKey> = self.rows.iter().map(|v| v.fire).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

impl<'a> IntoIterator for &'a VectorTable {
    type Item = &'a SpreadVector;
    type IntoIter = std::slice::Iter<'a, SpreadVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<SpreadVector> for VectorTable {
    fn from_iter<I: IntoIterator<Item = SpreadVector>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn int_cell(value: &AttrValue, column: &str) -> Result<i64> {
    value.as_i64().ok_or_else(|| Error::InvalidAttribute {
        column: column.to_owned(),
        value: value.to_string(),
        expected: "an integer",
    })
}

fn node_cell(value: &AttrValue, column: &str) -> Result<NodeId> {
    let id = int_cell(value, column)?;
    u32::try_from(id)
        .ok()
        .filter(|v| *v > 0)
        .map(NodeId)
        .ok_or_else(|| Error::InvalidAttribute {
            column: column.to_owned(),
            value: id.to_string(),
            expected: "a positive node id",
        })
}

/// Output of one vector-generation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorRun {
    pub vectors: VectorTable,
    pub report: ErrorReport,
}
