//! Point quadtree for containment queries.
//!
//! Each point is stored in exactly one node: on subdivision it moves into the
//! first child (NE, NW, SE, SW) whose closed bounds contain it. Queries need
//! no deduplication and `size()` is an exact count.

use tracing::{debug, trace};

use super::item::{Entry, ItemId, PointItem};
use super::{QuadtreeConfig, SpatialIndex, TreeStats};
use crate::error::Result;
use crate::geometry::{Aabb, Bounds, GeoBounds, Point, Rect};

#[derive(Debug)]
struct PointNode {
    bounds: Aabb,
    depth: u32,
    entries: Vec<Entry<Point>>,
    children: Option<Box<[PointNode; 4]>>,
}

impl PointNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, entry: Entry<Point>, config: &QuadtreeConfig) -> bool {
        if !self.bounds.contains_point(entry.shape) {
            return false;
        }

        if self.children.is_none() {
            if self.entries.len() < config.capacity || self.depth >= config.max_depth {
                self.entries.push(entry);
                return true;
            }
            self.subdivide(config);
        }

        match self.children.as_mut() {
            Some(children) => children.iter_mut().any(|child| child.insert(entry, config)),
            None => false,
        }
    }

    fn subdivide(&mut self, config: &QuadtreeConfig) {
        let depth = self.depth + 1;
        let [ne, nw, se, sw] = self.bounds.quadrants();
        let mut children = Box::new([
            PointNode::new(ne, depth),
            PointNode::new(nw, depth),
            PointNode::new(se, depth),
            PointNode::new(sw, depth),
        ]);

        let entries = std::mem::take(&mut self.entries);
        trace!(depth = self.depth, redistributed = entries.len(), "subdividing point node");
        for entry in entries {
            // Every entry lies inside this node, so some child accepts it.
            let placed = children.iter_mut().any(|child| child.insert(entry, config));
            debug_assert!(placed, "entry lost during redistribution");
        }
        self.children = Some(children);
    }

    fn collect(&self, area: &Aabb, out: &mut Vec<u32>) {
        out.extend(
            self.entries
                .iter()
                .filter(|entry| area.contains_point(entry.shape))
                .map(|entry| entry.slot),
        );

        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.intersects(area) {
                    child.collect(area, out);
                }
            }
        }
    }

    fn stats(&self) -> TreeStats {
        match &self.children {
            None => TreeStats::leaf(self.depth, self.entries.len()),
            Some(children) => {
                let mut stats = TreeStats {
                    node_count: 1,
                    leaf_count: 0,
                    subdivisions: 1,
                    max_depth: self.depth,
                    occupancy: self.entries.len(),
                };
                for child in children.iter() {
                    stats.merge(child.stats());
                }
                stats
            }
        }
    }
}

/// Quadtree over points, such as geographic markers.
#[derive(Debug)]
pub struct PointQuadtree<T> {
    root: PointNode,
    items: Vec<PointItem<T>>,
    config: QuadtreeConfig,
}

impl<T> PointQuadtree<T> {
    /// Create an empty tree, validating bounds and configuration.
    pub fn new(bounds: Bounds, config: QuadtreeConfig) -> Result<Self> {
        Self::with_root(bounds.to_root()?, config)
    }

    fn with_root(bounds: Aabb, config: QuadtreeConfig) -> Result<Self> {
        bounds.validate_root()?;
        config.validate()?;
        Ok(Self {
            root: PointNode::new(bounds, 0),
            items: Vec::new(),
            config,
        })
    }

    /// Insert a point item.
    ///
    /// Returns `false` if the point lies outside the root bounds; the item is
    /// dropped and will never appear in a query.
    pub fn insert(&mut self, item: PointItem<T>) -> bool {
        let slot = self.items.len() as u32;
        if !self.root.insert(Entry { slot, shape: item.shape }, &self.config) {
            debug!(id = %item.id, x = item.shape.x, y = item.shape.y, "dropping point outside index bounds");
            return false;
        }
        self.items.push(item);
        true
    }

    /// Items whose point lies inside `area` (edges included).
    pub fn query(&self, area: &Rect) -> Vec<&PointItem<T>> {
        let area = area.to_aabb();
        let mut slots = Vec::new();
        if self.root.bounds.intersects(&area) {
            self.root.collect(&area, &mut slots);
        }
        slots.into_iter().map(|slot| &self.items[slot as usize]).collect()
    }

    /// Items inside geographic bounds.
    pub fn query_geo(&self, area: &GeoBounds) -> Vec<&PointItem<T>> {
        self.query(&Rect::from(area.to_aabb()))
    }

    /// Identifiers of the items inside `area`.
    pub fn query_ids(&self, area: &Rect) -> Vec<ItemId> {
        self.query(area).into_iter().map(|item| item.id).collect()
    }

    /// Number of stored items. Each item is held by exactly one node.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.root = PointNode::new(self.root.bounds, 0);
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointItem<T>> {
        self.items.iter()
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds.into()
    }

    pub fn config(&self) -> QuadtreeConfig {
        self.config
    }

    pub fn stats(&self) -> TreeStats {
        self.root.stats()
    }
}

impl<T> SpatialIndex for PointQuadtree<T> {
    type Shape = Point;
    type Payload = T;

    fn with_bounds(bounds: Aabb, config: QuadtreeConfig) -> Result<Self> {
        Self::with_root(bounds, config)
    }

    fn insert_item(&mut self, item: PointItem<T>) -> bool {
        self.insert(item)
    }

    fn query_area(&self, area: &Rect) -> Vec<&PointItem<T>> {
        self.query(area)
    }

    fn size(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        PointQuadtree::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::geometry::LatLng;
    use crate::spatial::IndexedItem;
    use rstar::{AABB, RTree};
    use std::collections::HashSet;

    fn tree(capacity: usize, max_depth: u32) -> PointQuadtree<u32> {
        PointQuadtree::new(
            Bounds::from(Rect::new(0.0, 0.0, 100.0, 100.0)),
            QuadtreeConfig::new(capacity, max_depth),
        )
        .unwrap()
    }

    fn sorted_ids(items: Vec<&PointItem<u32>>) -> Vec<u32> {
        let mut ids: Vec<u32> = items.into_iter().map(|item| item.id.raw()).collect();
        ids.sort_unstable();
        ids
    }

    fn count_entries(node: &PointNode) -> usize {
        node.entries.len()
            + node
                .children
                .as_ref()
                .map_or(0, |children| children.iter().map(count_entries).sum())
    }

    #[test]
    fn test_single_subdivision_scenario() {
        let mut tree = tree(4, 1);
        for i in 1..=5 {
            let v = i as f64;
            assert!(tree.insert(IndexedItem::new(i, Point::new(v, v), i)));
        }

        assert_eq!(tree.stats().subdivisions, 1);

        let found = tree.query(&Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(found.len(), 5);
        assert_eq!(sorted_ids(found), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_clustered_points_cascade_with_depth() {
        let mut tree = tree(4, 8);
        for i in 1..=5 {
            let v = i as f64;
            tree.insert(IndexedItem::new(i, Point::new(v, v), i));
        }

        assert!(tree.stats().subdivisions > 1);
        assert_eq!(sorted_ids(tree.query(&Rect::new(0.0, 0.0, 10.0, 10.0))), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_outside_point_rejected() {
        let mut tree = tree(4, 8);
        assert!(!tree.insert(IndexedItem::new(0, Point::new(100.5, 50.0), 0)));
        assert!(!tree.insert(IndexedItem::new(1, Point::new(-0.1, 50.0), 1)));
        assert!(!tree.insert(IndexedItem::new(2, Point::new(f64::NAN, 50.0), 2)));
        // Edges are inside.
        assert!(tree.insert(IndexedItem::new(3, Point::new(100.0, 100.0), 3)));
        assert!(tree.insert(IndexedItem::new(4, Point::new(0.0, 0.0), 4)));

        assert_eq!(tree.size(), 2);
        assert_eq!(
            sorted_ids(tree.query(&Rect::new(-50.0, -50.0, 300.0, 300.0))),
            vec![3, 4]
        );
    }

    #[test]
    fn test_each_point_stored_once() {
        let mut tree = tree(2, 8);
        // Points on the split lines of several levels.
        let points = [
            (50.0, 50.0),
            (50.0, 25.0),
            (25.0, 50.0),
            (75.0, 50.0),
            (50.0, 75.0),
            (25.0, 25.0),
            (0.0, 50.0),
            (100.0, 50.0),
        ];
        for (id, &(x, y)) in points.iter().enumerate() {
            assert!(tree.insert(IndexedItem::new(id as u32, Point::new(x, y), id as u32)));
        }

        assert_eq!(count_entries(&tree.root), points.len());
        assert_eq!(tree.size(), points.len());

        let all = tree.query(&tree.bounds());
        let unique: HashSet<_> = all.iter().map(|item| item.id).collect();
        assert_eq!(all.len(), points.len());
        assert_eq!(unique.len(), points.len());
    }

    #[test]
    fn test_identical_points_bounded_by_depth() {
        let mut tree = tree(1, 4);
        for id in 0..50 {
            assert!(tree.insert(IndexedItem::new(id, Point::new(10.0, 10.0), id)));
        }
        assert_eq!(tree.stats().max_depth, 4);
        assert_eq!(tree.query(&Rect::new(10.0, 10.0, 0.0, 0.0)).len(), 50);
    }

    #[test]
    fn test_max_depth_limit() {
        let bounds = Bounds::from(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(matches!(
            PointQuadtree::<u32>::new(bounds, QuadtreeConfig::new(1, 1_000_000)),
            Err(IndexError::InvalidMaxDepth { max_depth: 1_000_000, .. })
        ));

        let limit = QuadtreeConfig::MAX_DEPTH_LIMIT;
        let mut tree = tree(1, limit);
        assert!(tree.insert(IndexedItem::new(0, Point::new(10.0, 10.0), 0)));
        assert!(tree.insert(IndexedItem::new(1, Point::new(10.0, 10.0), 1)));
        assert_eq!(tree.stats().max_depth, limit);
        assert_eq!(sorted_ids(tree.query(&Rect::new(10.0, 10.0, 0.0, 0.0))), vec![0, 1]);
    }

    #[test]
    fn test_geographic_bounds() {
        let bounds = Bounds::from(GeoBounds::new(90.0, -90.0, 180.0, -180.0));
        let mut tree = PointQuadtree::new(bounds, QuadtreeConfig::new(2, 8)).unwrap();

        let cities = [
            ("london", LatLng::new(51.5, -0.12)),
            ("paris", LatLng::new(48.85, 2.35)),
            ("tokyo", LatLng::new(35.68, 139.69)),
            ("sydney", LatLng::new(-33.87, 151.21)),
            ("lima", LatLng::new(-12.05, -77.04)),
        ];
        for (id, (name, ll)) in cities.iter().enumerate() {
            assert!(tree.insert(IndexedItem::new(id as u32, Point::from(*ll), *name)));
        }

        let europe = GeoBounds::new(60.0, 35.0, 30.0, -10.0);
        let mut names: Vec<&str> = tree.query_geo(&europe).into_iter().map(|item| item.payload).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["london", "paris"]);
    }

    #[test]
    fn test_clear() {
        let mut tree = tree(1, 8);
        for id in 0..10 {
            let v = id as f64 * 10.0;
            tree.insert(IndexedItem::new(id, Point::new(v, v), id));
        }
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.stats().node_count, 1);
        assert!(tree.query(&tree.bounds()).is_empty());
    }

    #[test]
    fn test_matches_rtree_oracle() {
        let mut state = 99u64;
        let mut next = move |max: f64| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * max
        };

        let points: Vec<[f64; 2]> = (0..1000).map(|_| [next(100.0), next(100.0)]).collect();
        let oracle = RTree::bulk_load(points.clone());
        let queries: Vec<Rect> = (0..40)
            .map(|_| Rect::new(next(100.0), next(100.0), next(25.0), next(25.0)))
            .collect();

        for (capacity, max_depth) in [(1, 12), (8, 3), (64, 8)] {
            let mut tree = tree(capacity, max_depth);
            for (id, p) in points.iter().enumerate() {
                assert!(tree.insert(IndexedItem::new(id as u32, Point::new(p[0], p[1]), id as u32)));
            }
            assert_eq!(tree.size(), points.len());

            for query in &queries {
                let envelope = AABB::from_corners(
                    [query.min_x(), query.min_y()],
                    [query.max_x(), query.max_y()],
                );
                let mut expected: Vec<[u64; 2]> = oracle
                    .locate_in_envelope(&envelope)
                    .map(|p| [p[0].to_bits(), p[1].to_bits()])
                    .collect();
                expected.sort_unstable();

                let mut actual: Vec<[u64; 2]> = tree
                    .query(query)
                    .into_iter()
                    .map(|item| [item.shape.x.to_bits(), item.shape.y.to_bits()])
                    .collect();
                actual.sort_unstable();

                assert_eq!(actual, expected, "capacity={capacity}, max_depth={max_depth}");
            }
        }
    }
}
