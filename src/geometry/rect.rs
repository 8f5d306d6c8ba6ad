//! Cartesian points and rectangles.
//!
//! Two rectangle forms are provided:
//! - [`Rect`]: the caller-facing `{x, y, width, height}` form
//! - [`Aabb`]: min/max corners, used for node bounds and overlap tests
//!
//! All predicates treat rectangles as closed: touching edges overlap and a
//! point on an edge is contained.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// A position on the Cartesian plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in `{x, y, width, height}` form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn min_x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn min_y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Convert to min/max corner form.
    #[inline]
    pub fn to_aabb(&self) -> Aabb {
        Aabb::new(self.min_x(), self.min_y(), self.max_x(), self.max_y())
    }

    /// Check that all coordinates are finite and the size is non-negative.
    pub fn validate(&self) -> Result<()> {
        if !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
        {
            return Err(IndexError::NonFiniteBounds);
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(IndexError::InvertedBounds(format!(
                "width={}, height={}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl From<Aabb> for Rect {
    fn from(aabb: Aabb) -> Self {
        Self::new(aabb.min_x, aabb.min_y, aabb.width(), aabb.height())
    }
}

/// Axis-aligned bounding box stored as min/max corners.
///
/// Quadtree nodes keep their bounds in this form so that sibling quadrants
/// share the exact same split coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    #[inline]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Check if two boxes share any area or edge.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if a point lies inside or on the edge of this box.
    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Split at the midpoint into NE, NW, SE, SW quadrants.
    ///
    /// North is the half with the larger `y`.
    pub fn quadrants(&self) -> [Aabb; 4] {
        let mid = self.center();
        [
            Aabb::new(mid.x, mid.y, self.max_x, self.max_y),
            Aabb::new(self.min_x, mid.y, mid.x, self.max_y),
            Aabb::new(mid.x, self.min_y, self.max_x, mid.y),
            Aabb::new(self.min_x, self.min_y, mid.x, mid.y),
        ]
    }

    /// Which of the four quadrants (NE, NW, SE, SW) an extent overlaps,
    /// decided by comparing its edges against the midpoint.
    pub fn overlapping_quadrants(&self, extent: &Aabb) -> [bool; 4] {
        let mid = self.center();
        let north = extent.max_y >= mid.y;
        let south = extent.min_y <= mid.y;
        let east = extent.max_x >= mid.x;
        let west = extent.min_x <= mid.x;
        [north && east, north && west, south && east, south && west]
    }

    /// Validate this box as the root of an index: finite, non-inverted and
    /// with a positive area.
    pub fn validate_root(&self) -> Result<()> {
        if !self.is_finite() {
            return Err(IndexError::NonFiniteBounds);
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(IndexError::InvertedBounds(format!(
                "min=({}, {}), max=({}, {})",
                self.min_x, self.min_y, self.max_x, self.max_y
            )));
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(IndexError::DegenerateBounds {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_to_aabb() {
        let aabb = Rect::new(10.0, 20.0, 30.0, 40.0).to_aabb();
        assert_eq!(aabb, Aabb::new(10.0, 20.0, 40.0, 60.0));
        assert_eq!(Rect::from(aabb), Rect::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn test_rect_validate() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).validate().is_ok());
        assert!(matches!(
            Rect::new(0.0, 0.0, -1.0, 5.0).validate(),
            Err(IndexError::InvertedBounds(_))
        ));
        assert_eq!(
            Rect::new(f64::NAN, 0.0, 1.0, 1.0).validate(),
            Err(IndexError::NonFiniteBounds)
        );
    }

    #[test]
    fn test_intersects_is_closed() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let touching = Aabb::new(10.0, 0.0, 20.0, 10.0);
        let apart = Aabb::new(10.5, 0.0, 20.0, 10.0);

        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_contains_point_edges() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.contains_point(Point::new(0.0, 0.0)));
        assert!(a.contains_point(Point::new(10.0, 10.0)));
        assert!(!a.contains_point(Point::new(10.0001, 5.0)));
    }

    #[test]
    fn test_quadrants_partition_parent() {
        let parent = Aabb::new(0.0, 0.0, 100.0, 50.0);
        let [ne, nw, se, sw] = parent.quadrants();

        assert_eq!(ne, Aabb::new(50.0, 25.0, 100.0, 50.0));
        assert_eq!(nw, Aabb::new(0.0, 25.0, 50.0, 50.0));
        assert_eq!(se, Aabb::new(50.0, 0.0, 100.0, 25.0));
        assert_eq!(sw, Aabb::new(0.0, 0.0, 50.0, 25.0));

        let area: f64 = [ne, nw, se, sw].iter().map(|q| q.width() * q.height()).sum();
        assert_eq!(area, parent.width() * parent.height());
    }

    #[test]
    fn test_overlapping_quadrants() {
        let node = Aabb::new(0.0, 0.0, 100.0, 100.0);

        let inside_sw = Aabb::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(node.overlapping_quadrants(&inside_sw), [false, false, false, true]);

        let straddle_all = Aabb::new(40.0, 40.0, 60.0, 60.0);
        assert_eq!(node.overlapping_quadrants(&straddle_all), [true; 4]);

        let on_vertical_mid = Aabb::new(50.0, 80.0, 50.0, 80.0);
        assert_eq!(
            node.overlapping_quadrants(&on_vertical_mid),
            [true, true, false, false]
        );
    }

    #[test]
    fn test_validate_root() {
        assert!(Aabb::new(0.0, 0.0, 1.0, 1.0).validate_root().is_ok());
        assert!(matches!(
            Aabb::new(5.0, 0.0, 1.0, 1.0).validate_root(),
            Err(IndexError::InvertedBounds(_))
        ));
        assert!(matches!(
            Aabb::new(0.0, 0.0, 0.0, 1.0).validate_root(),
            Err(IndexError::DegenerateBounds { .. })
        ));
        assert_eq!(
            Aabb::new(0.0, 0.0, f64::INFINITY, 1.0).validate_root(),
            Err(IndexError::NonFiniteBounds)
        );
    }
}
