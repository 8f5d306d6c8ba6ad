//! Quadtree spatial indexing for viewport queries.
//!
//! Two variants share the same node layout (four exclusively owned children
//! created on subdivision, NE/NW/SE/SW order) but differ in how items are
//! placed:
//!
//! - [`RegionQuadtree`]: rectangle extents, replicated into every child they
//!   overlap and deduplicated by [`ItemId`] at query time
//! - [`PointQuadtree`]: points, each stored in exactly one node
//!
//! [`SpatialIndex`] is the seam the progressive builder drives.

mod item;
mod point;
mod region;

pub use item::{ExtentItem, IndexedItem, ItemId, PointItem};
pub use point::PointQuadtree;
pub use region::RegionQuadtree;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::geometry::{Aabb, Rect};

/// Tree shape configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuadtreeConfig {
    /// Maximum items a node holds locally before subdividing.
    pub capacity: usize,
    /// Depth at which nodes stop subdividing and hold any number of items.
    pub max_depth: u32,
}

impl QuadtreeConfig {
    /// Deepest `max_depth` accepted. Insertion recurses once per level.
    pub const MAX_DEPTH_LIMIT: u32 = 32;

    pub fn new(capacity: usize, max_depth: u32) -> Self {
        Self { capacity, max_depth }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(IndexError::InvalidCapacity);
        }
        if self.max_depth > Self::MAX_DEPTH_LIMIT {
            return Err(IndexError::InvalidMaxDepth {
                max_depth: self.max_depth,
                limit: Self::MAX_DEPTH_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            max_depth: 8,
        }
    }
}

/// Structural statistics for a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Total nodes, root included.
    pub node_count: usize,
    /// Nodes without children.
    pub leaf_count: usize,
    /// Subdivided nodes. Every subdivision creates exactly one of these.
    pub subdivisions: usize,
    /// Deepest node depth (root = 0).
    pub max_depth: u32,
    /// Sum of node-local entries, duplicates included.
    pub occupancy: usize,
}

impl TreeStats {
    pub(crate) fn leaf(depth: u32, occupancy: usize) -> Self {
        Self {
            node_count: 1,
            leaf_count: 1,
            subdivisions: 0,
            max_depth: depth,
            occupancy,
        }
    }

    pub(crate) fn merge(&mut self, child: TreeStats) {
        self.node_count += child.node_count;
        self.leaf_count += child.leaf_count;
        self.subdivisions += child.subdivisions;
        self.max_depth = self.max_depth.max(child.max_depth);
        self.occupancy += child.occupancy;
    }
}

/// Common interface over both index variants.
pub trait SpatialIndex: Sized {
    /// Item shape: [`Rect`] or [`Point`](crate::geometry::Point).
    type Shape;
    /// Caller payload.
    type Payload;

    /// Create an empty index over pre-validated root bounds.
    fn with_bounds(bounds: Aabb, config: QuadtreeConfig) -> Result<Self>;

    /// Insert an item, returning `false` if it was dropped.
    fn insert_item(&mut self, item: IndexedItem<Self::Shape, Self::Payload>) -> bool;

    /// Unique items overlapping `area`, in no particular order.
    fn query_area(&self, area: &Rect) -> Vec<&IndexedItem<Self::Shape, Self::Payload>>;

    /// Storage size as each variant defines it.
    fn size(&self) -> usize;

    fn clear(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = QuadtreeConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.max_depth, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_zero_capacity() {
        assert_eq!(
            QuadtreeConfig::new(0, 4).validate(),
            Err(IndexError::InvalidCapacity)
        );
    }

    #[test]
    fn test_config_max_depth_limit() {
        let limit = QuadtreeConfig::MAX_DEPTH_LIMIT;
        assert!(QuadtreeConfig::new(4, limit).validate().is_ok());
        assert_eq!(
            QuadtreeConfig::new(1, 1_000_000).validate(),
            Err(IndexError::InvalidMaxDepth {
                max_depth: 1_000_000,
                limit,
            })
        );
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: QuadtreeConfig = serde_json::from_str(r#"{"maxDepth": 3}"#).unwrap();
        assert_eq!(config, QuadtreeConfig::new(10, 3));
    }
}
