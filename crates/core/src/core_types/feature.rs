//! Planar feature collections
//!
//! The in-memory stand-in for polygon/point feature files: an ordered list of
//! geometries with attribute columns and one shared reference frame. Loaders
//! for concrete file formats live outside this crate.

use crate::core_types::columns::Columns;
use crate::error::{Error, ErrorReport, Result};
use geo::{BoundingRect, Geometry, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Coordinate reference frame identifier (e.g. `"EPSG:3978"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(pub String);

impl Crs {
    pub fn new(id: impl Into<String>) -> Self {
        Crs(id.into())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Integer view; accepts integral floats and numeric text
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            AttrValue::Float(_) => None,
            AttrValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Floating point view; accepts integers and numeric text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_owned())
    }
}

/// Attribute row keyed by column name
pub type Attributes = BTreeMap<String, AttrValue>;

/// One record: geometry plus attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, column: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(column.to_owned(), value.into());
        self
    }

    /// Optional attribute lookup
    pub fn attr(&self, column: &str) -> Option<&AttrValue> {
        self.attributes.get(column)
    }

    /// Required integer attribute
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumn`] when the column is absent and
    /// [`Error::InvalidAttribute`] when it is not an integer.
    pub fn int(&self, column: &str, context: &str) -> Result<i64> {
        let value = self.attr(column).ok_or_else(|| Error::MissingColumn {
            column: column.to_owned(),
            context: context.to_owned(),
        })?;
        value.as_i64().ok_or_else(|| Error::InvalidAttribute {
            column: column.to_owned(),
            value: value.to_string(),
            expected: "an integer",
        })
    }

    /// Optional integer attribute; present-but-unreadable is still an error
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAttribute`] when the value is not an integer.
    pub fn int_opt(&self, column: &str) -> Result<Option<i64>> {
        match self.attr(column) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| Error::InvalidAttribute {
                column: column.to_owned(),
                value: value.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// Polygon parts of this record, if it is areal
    pub fn polygons(&self) -> Option<Vec<Polygon<f64>>> {
        polygons_of(&self.geometry)
    }

    /// Point of this record, if it is a point
    pub fn point(&self) -> Option<Point<f64>> {
        match &self.geometry {
            Geometry::Point(p) => Some(*p),
            Geometry::MultiPoint(mp) if mp.0.len() == 1 => Some(mp.0[0]),
            _ => None,
        }
    }
}

/// Split an areal geometry into its polygons
pub fn polygons_of(geometry: &Geometry<f64>) -> Option<Vec<Polygon<f64>>> {
    match geometry {
        Geometry::Polygon(p) => Some(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => Some(mp.0.clone()),
        Geometry::Rect(r) => Some(vec![r.to_polygon()]),
        Geometry::Triangle(t) => Some(vec![t.to_polygon()]),
        Geometry::GeometryCollection(gc) => {
            let mut parts = Vec::new();
            for g in &gc.0 {
                parts.extend(polygons_of(g)?);
            }
            Some(parts)
        }
        _ => None,
    }
}

/// Axis-aligned bounding extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Reject non-finite or inverted extents
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtent`] when a bound is not finite or max < min.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.xmin, self.ymin, self.xmax, self.ymax]
            .into_iter()
            .all(f64::is_finite);
        if !finite || self.xmax < self.xmin || self.ymax < self.ymin {
            return Err(Error::InvalidExtent {
                xmin: self.xmin,
                ymin: self.ymin,
                xmax: self.xmax,
                ymax: self.ymax,
            });
        }
        Ok(())
    }

    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// Smallest extent covering both
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }
}

/// Ordered records sharing one reference frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub crs: Option<Crs>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(crs: Option<Crs>) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    pub fn with_features(crs: Option<Crs>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Bounding extent of every geometry, `None` for an empty collection
    pub fn total_bounds(&self) -> Option<Extent> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(|r| Extent::new(r.min().x, r.min().y, r.max().x, r.max().y))
            .reduce(|a, b| a.union(&b))
    }

    /// Build point features from attribute rows holding x/y coordinate columns
    ///
    /// The coordinate columns are consumed; every other column is kept.
    ///
    /// # Errors
    ///
    /// Fails when a row lacks a coordinate column or holds a non-numeric one.
    pub fn points_from_xy(
        rows: Vec<Attributes>,
        columns: &Columns,
        crs: Option<Crs>,
    ) -> Result<Self> {
        let mut features = Vec::with_capacity(rows.len());
        for mut attributes in rows {
            let x = take_coordinate(&mut attributes, &columns.x)?;
            let y = take_coordinate(&mut attributes, &columns.y)?;
            features.push(Feature {
                geometry: Geometry::Point(Point::new(x, y)),
                attributes,
            });
        }
        Ok(Self { crs, features })
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

fn take_coordinate(attributes: &mut Attributes, column: &str) -> Result<f64> {
    let value = attributes.remove(column).ok_or_else(|| Error::MissingColumn {
        column: column.to_owned(),
        context: "ignition point row".to_owned(),
    })?;
    value.as_f64().ok_or_else(|| Error::InvalidAttribute {
        column: column.to_owned(),
        value: value.to_string(),
        expected: "a coordinate",
    })
}

/// Verify that all named frames agree
///
/// Defined frames that differ are fatal. Undefined frames are processed anyway
/// and surface as warnings on `report`.
///
/// # Errors
///
/// Returns [`Error::CrsMismatch`] for two differing defined frames.
pub fn check_frames(frames: &[(&str, Option<&Crs>)], report: &mut ErrorReport) -> Result<()> {
    let mut reference: Option<&Crs> = None;
    for (name, crs) in frames.iter().copied() {
        match (crs, reference) {
            (None, _) => {
                let message = format!(
                    "{name} has no defined reference frame; assuming it matches the other inputs"
                );
                warn!("{}", message);
                report.warn(message);
            }
            (Some(crs), None) => reference = Some(crs),
            (Some(crs), Some(expected)) if crs != expected => {
                return Err(Error::CrsMismatch {
                    left: expected.to_string(),
                    right: crs.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}
