//! Semantic unit types for planar measurements
//!
//! Newtype wrappers keep areas, lengths and bearings from being mixed up when
//! they travel between the overlay, aggregation and rose stages.
//!
//! # Design Philosophy
//! - All quantities use f64 (projected coordinates are routinely > 10^6 m)
//! - Total ordering via `Ord` (NaN sorts greater than all values)
//! - `Deref` to the raw value for arithmetic-heavy call sites
//! - Serde support for serialization
//!
//! # Usage
//! ```
//! use fire_spread_core::core_types::units::{Hectares, SquareMeters};
//!
//! let area = SquareMeters::new(25_000.0);
//! let ha: Hectares = area.into();
//! assert!((*ha - 2.5).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Deref, Mul, Sub};

/// Square meters per hectare
const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

#[inline]
fn f64_total_cmp(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

// ============================================================================
// AREA TYPES
// ============================================================================

/// Planar area in square map units (square meters for metric projections)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SquareMeters(f64);

impl Eq for SquareMeters {}

impl PartialOrd for SquareMeters {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SquareMeters {
    fn cmp(&self, other: &Self) -> Ordering {
        f64_total_cmp(self.0, other.0)
    }
}

impl Deref for SquareMeters {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl SquareMeters {
    /// Zero area
    pub const ZERO: SquareMeters = SquareMeters(0.0);

    /// Create a new area value
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        SquareMeters(value)
    }

    /// Convert to hectares
    #[inline]
    #[must_use]
    pub fn to_hectares(self) -> Hectares {
        Hectares(self.0 / SQUARE_METERS_PER_HECTARE)
    }
}

impl Add for SquareMeters {
    type Output = SquareMeters;
    fn add(self, rhs: SquareMeters) -> SquareMeters {
        SquareMeters(self.0 + rhs.0)
    }
}

impl AddAssign for SquareMeters {
    fn add_assign(&mut self, rhs: SquareMeters) {
        self.0 += rhs.0;
    }
}

impl Sub for SquareMeters {
    type Output = SquareMeters;
    fn sub(self, rhs: SquareMeters) -> SquareMeters {
        SquareMeters(self.0 - rhs.0)
    }
}

impl Mul<f64> for SquareMeters {
    type Output = SquareMeters;
    fn mul(self, rhs: f64) -> SquareMeters {
        SquareMeters(self.0 * rhs)
    }
}

impl PartialEq<f64> for SquareMeters {
    fn eq(&self, other: &f64) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<f64> for SquareMeters {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.0.partial_cmp(other)
    }
}

impl From<f64> for SquareMeters {
    fn from(value: f64) -> Self {
        SquareMeters(value)
    }
}

impl From<SquareMeters> for f64 {
    fn from(value: SquareMeters) -> Self {
        value.0
    }
}

impl fmt::Display for SquareMeters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m²", self.0)
    }
}

/// Area in hectares (fireshed/fireplain reporting unit)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hectares(f64);

impl Eq for Hectares {}

impl PartialOrd for Hectares {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hectares {
    fn cmp(&self, other: &Self) -> Ordering {
        f64_total_cmp(self.0, other.0)
    }
}

impl Deref for Hectares {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Hectares {
    /// Create a new hectare value
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Hectares(value)
    }

    /// Convert to square meters
    #[inline]
    #[must_use]
    pub fn to_square_meters(self) -> SquareMeters {
        SquareMeters(self.0 * SQUARE_METERS_PER_HECTARE)
    }
}

impl From<SquareMeters> for Hectares {
    fn from(value: SquareMeters) -> Self {
        value.to_hectares()
    }
}

impl From<Hectares> for SquareMeters {
    fn from(value: Hectares) -> Self {
        value.to_square_meters()
    }
}

impl fmt::Display for Hectares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ha", self.0)
    }
}

// ============================================================================
// ANGLE TYPES
// ============================================================================

/// Angle in degrees
///
/// Bearings produced by this crate are clockwise from north (+y) in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Degrees(f64);

impl Eq for Degrees {}

impl PartialOrd for Degrees {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Degrees {
    fn cmp(&self, other: &Self) -> Ordering {
        f64_total_cmp(self.0, other.0)
    }
}

impl Deref for Degrees {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Degrees {
    /// Create a new angle
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Degrees(value)
    }

    /// Bearing of the vector `(dx, dy)` clockwise from north, in `[0, 360)`
    #[inline]
    #[must_use]
    pub fn bearing(dx: f64, dy: f64) -> Self {
        Degrees((360.0 + dx.atan2(dy).to_degrees()) % 360.0)
    }
}

impl PartialEq<f64> for Degrees {
    fn eq(&self, other: &f64) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<f64> for Degrees {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.0.partial_cmp(other)
    }
}

impl From<f64> for Degrees {
    fn from(value: f64) -> Self {
        Degrees(value)
    }
}

impl From<Degrees> for f64 {
    fn from(value: Degrees) -> Self {
        value.0
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_area_conversions() {
        let area = SquareMeters::new(15_000.0);
        assert_relative_eq!(*area.to_hectares(), 1.5);
        assert_relative_eq!(*Hectares::new(2.0).to_square_meters(), 20_000.0);
    }

    #[test]
    fn test_bearing_quadrants() {
        assert_relative_eq!(*Degrees::bearing(0.0, 1.0), 0.0);
        assert_relative_eq!(*Degrees::bearing(1.0, 0.0), 90.0);
        assert_relative_eq!(*Degrees::bearing(0.0, -1.0), 180.0);
        assert_relative_eq!(*Degrees::bearing(-1.0, 0.0), 270.0);
    }

    #[test]
    fn test_total_ordering() {
        let mut areas = vec![SquareMeters::new(3.0), SquareMeters::new(1.0), SquareMeters::new(2.0)];
        areas.sort();
        assert_eq!(areas[0], 1.0);
        assert_eq!(areas[2], 3.0);
    }
}
