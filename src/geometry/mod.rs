//! Geometry primitives shared by both index variants.
//!
//! This module provides points, rectangles and geographic bounds along with
//! the closed overlap and containment predicates the quadtrees rely on.

mod geo;
mod rect;

pub use geo::{Bounds, GeoBounds, LatLng};
pub use rect::{Aabb, Point, Rect};
