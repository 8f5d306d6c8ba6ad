//! Geographic coordinates and the caller-facing [`Bounds`] type.
//!
//! Geographic values are mapped onto the Cartesian plane with
//! `x = longitude` and `y = latitude`, so "north" in a quadtree is the half
//! with the larger `y`.

use serde::{Deserialize, Serialize};

use super::rect::{Aabb, Point, Rect};
use crate::error::{IndexError, Result};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for Point {
    #[inline]
    fn from(ll: LatLng) -> Self {
        Point::new(ll.lng, ll.lat)
    }
}

/// Geographic bounds in `{north, south, east, west}` form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self { north, south, east, west }
    }

    #[inline]
    pub fn to_aabb(&self) -> Aabb {
        Aabb::new(self.west, self.south, self.east, self.north)
    }

    /// Check that all edges are finite, `north >= south` and `east >= west`.
    pub fn validate(&self) -> Result<()> {
        if !(self.north.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.west.is_finite())
        {
            return Err(IndexError::NonFiniteBounds);
        }
        if self.north < self.south || self.east < self.west {
            return Err(IndexError::InvertedBounds(format!(
                "north={}, south={}, east={}, west={}",
                self.north, self.south, self.east, self.west
            )));
        }
        Ok(())
    }
}

/// A rectangular region in either Cartesian or geographic form.
///
/// Deserializes from either object shape without a tag, which is how JS
/// callers pass bounds through `serde-wasm-bindgen`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bounds {
    Cartesian(Rect),
    Geographic(GeoBounds),
}

impl Bounds {
    /// Check the form-specific invariants.
    pub fn validate(&self) -> Result<()> {
        match self {
            Bounds::Cartesian(rect) => rect.validate(),
            Bounds::Geographic(geo) => geo.validate(),
        }
    }

    /// Convert to min/max corner form without validation.
    pub fn to_aabb(&self) -> Aabb {
        match self {
            Bounds::Cartesian(rect) => rect.to_aabb(),
            Bounds::Geographic(geo) => geo.to_aabb(),
        }
    }

    /// Validate for use as an index root and convert.
    ///
    /// Beyond the form invariants, a root must enclose a positive area.
    pub fn to_root(&self) -> Result<Aabb> {
        self.validate()?;
        let aabb = self.to_aabb();
        aabb.validate_root()?;
        Ok(aabb)
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Bounds::Cartesian(rect)
    }
}

impl From<GeoBounds> for Bounds {
    fn from(geo: GeoBounds) -> Self {
        Bounds::Geographic(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_to_point() {
        let p: Point = LatLng::new(51.5, -0.12).into();
        assert_eq!(p, Point::new(-0.12, 51.5));
    }

    #[test]
    fn test_geo_bounds_to_aabb() {
        let geo = GeoBounds::new(60.0, 40.0, 10.0, -10.0);
        assert_eq!(geo.to_aabb(), Aabb::new(-10.0, 40.0, 10.0, 60.0));
    }

    #[test]
    fn test_geo_bounds_inverted() {
        let geo = GeoBounds::new(40.0, 60.0, 10.0, -10.0);
        assert!(matches!(geo.validate(), Err(IndexError::InvertedBounds(_))));

        let geo = GeoBounds::new(60.0, 40.0, -10.0, 10.0);
        assert!(matches!(geo.validate(), Err(IndexError::InvertedBounds(_))));
    }

    #[test]
    fn test_bounds_deserialize_either_form() {
        let cartesian: Bounds =
            serde_json::from_str(r#"{"x": 0, "y": 0, "width": 100, "height": 50}"#).unwrap();
        assert_eq!(cartesian, Bounds::Cartesian(Rect::new(0.0, 0.0, 100.0, 50.0)));

        let geographic: Bounds =
            serde_json::from_str(r#"{"north": 1, "south": -1, "east": 2, "west": -2}"#).unwrap();
        assert_eq!(
            geographic,
            Bounds::Geographic(GeoBounds::new(1.0, -1.0, 2.0, -2.0))
        );

        assert!(serde_json::from_str::<Bounds>(r#"{"top": 1}"#).is_err());
    }

    #[test]
    fn test_to_root_rejects_degenerate() {
        let flat = Bounds::from(Rect::new(0.0, 0.0, 10.0, 0.0));
        assert!(flat.validate().is_ok());
        assert!(matches!(flat.to_root(), Err(IndexError::DegenerateBounds { .. })));

        let ok = Bounds::from(GeoBounds::new(1.0, 0.0, 1.0, 0.0));
        assert_eq!(ok.to_root().unwrap(), Aabb::new(0.0, 0.0, 1.0, 1.0));
    }
}
