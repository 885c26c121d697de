//! Error types and the per-run error report
//!
//! Two tiers of failure exist:
//! - [`Error`]: fatal configuration or input-shape problems. Returned immediately.
//! - [`FireError`]: a single fire could not be processed. Vector generators catch
//!   these, record them in an [`ErrorReport`] and carry on with the other fires.

use crate::core_types::FireKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Result alias for fallible crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cell size must be finite and positive
    #[error("cell size {kind} must be finite and positive, got {value}")]
    InvalidCellSize { kind: &'static str, value: f64 },

    /// Bounding extent is empty, inverted or non-finite
    #[error("invalid extent ({xmin}, {ymin}, {xmax}, {ymax})")]
    InvalidExtent {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },

    /// Two collections in one computation use different reference frames
    #[error("reference frame mismatch: '{left}' vs '{right}', reproject inputs before processing")]
    CrsMismatch { left: String, right: String },

    /// A required attribute column is absent from a feature
    #[error("column '{column}' missing from {context}")]
    MissingColumn { column: String, context: String },

    /// An attribute exists but cannot be read as the required type
    #[error("column '{column}' holds '{value}', expected {expected}")]
    InvalidAttribute {
        column: String,
        value: String,
        expected: &'static str,
    },

    /// Vector table is not in the expected 3/4-column shape
    #[error("vector table has {found} columns; expected columns: '{origin}', '{destination}', '{fire}', ('{day}')")]
    Schema {
        found: usize,
        origin: String,
        destination: String,
        fire: String,
        day: String,
    },

    /// Iteration count used for normalisation must be positive
    #[error("iteration count must be positive, got {0}")]
    InvalidIterations(u32),

    /// Sector angle outside [0, 360]
    #[error("sector angle must lie in [0, 360], got {0}")]
    InvalidAngle(f64),

    /// Writing the error log failed
    #[error("error log I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Recoverable failure while computing vectors for one fire
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FireError {
    /// No ignition point carries this fire's key
    #[error("no ignition point found")]
    NoIgnitionPoint,

    /// Ignition point lies outside every hexagon (or on a shared edge)
    #[error("ignition point is not inside any hexagon")]
    NoIgnitionHexagon,

    /// Ignition points of one fire fall in more than one hexagon
    #[error("ignition points fall in {0} different hexagons")]
    MultipleIgnitionHexagons(usize),

    /// Fire has no perimeter records for the requested day selection
    #[error("fire has no perimeter records")]
    EmptyPerimeter,

    /// Geometry of a record is unusable (wrong type or attribute)
    #[error("{0}")]
    Geometry(String),
}

/// One skipped fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireErrorRecord {
    pub fire: FireKey,
    pub message: String,
}

impl fmt::Display for FireErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} occurs for fire ID # {}", self.message, self.fire)
    }
}

/// Error-log side channel of one generator call
///
/// Holds every skipped fire plus non-fatal warnings (e.g. undefined reference
/// frames). The caller decides whether to persist it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub fire_errors: Vec<FireErrorRecord>,
    pub warnings: Vec<String>,
}

impl ErrorReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped fire
    pub fn record(&mut self, fire: FireKey, error: &FireError) {
        self.fire_errors.push(FireErrorRecord {
            fire,
            message: error.to_string(),
        });
    }

    /// Record a non-fatal warning
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// True when no fire was skipped
    pub fn is_clean(&self) -> bool {
        self.fire_errors.is_empty()
    }

    /// Render the log text, one line per skipped fire
    pub fn to_log_text(&self) -> String {
        self.fire_errors
            .iter()
            .map(|record| format!("{record} \n"))
            .collect()
    }

    /// Write the log to `path`, replacing any previous log
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be written.
    pub fn write_log(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_log_text())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        let mut report = ErrorReport::new();
        report.record(FireKey::new(17), &FireError::NoIgnitionHexagon);
        assert_eq!(
            report.to_log_text(),
            "ignition point is not inside any hexagon occurs for fire ID # 17 \n"
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_write_log_overwrites() {
        let path = std::env::temp_dir().join(format!("fire_spread_errlog_{}.txt", std::process::id()));
        std::fs::write(&path, "stale contents from an earlier run\n").unwrap();

        let mut report = ErrorReport::new();
        report.record(FireKey::with_iteration(3, 2), &FireError::MultipleIgnitionHexagons(2));
        report.write_log(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains("fire ID # 3"));
        std::fs::remove_file(&path).unwrap();
    }
}
