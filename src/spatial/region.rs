//! Region quadtree for rectangle-overlap queries.
//!
//! Items are axis-aligned extents. An extent that straddles a split line is
//! stored in every child it overlaps, so per-node counts can include the
//! same item several times; queries deduplicate by [`ItemId`] at the root.
//!
//! Extents are indexed by their part inside the root bounds. An extent that
//! does not touch the root bounds at all is dropped.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::item::{Entry, ExtentItem, ItemId};
use super::{QuadtreeConfig, SpatialIndex, TreeStats};
use crate::error::Result;
use crate::geometry::{Aabb, Bounds, Rect};

/// A node in the region quadtree.
#[derive(Debug)]
struct RegionNode {
    bounds: Aabb,
    depth: u32,
    /// Entries held locally (only while this node is a leaf).
    entries: Vec<Entry<Aabb>>,
    /// Child nodes (NE, NW, SE, SW), created on subdivision.
    children: Option<Box<[RegionNode; 4]>>,
}

impl RegionNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, entry: Entry<Aabb>, config: &QuadtreeConfig) {
        if let Some(children) = self.children.as_mut() {
            let overlaps = self.bounds.overlapping_quadrants(&entry.shape);
            for (child, hit) in children.iter_mut().zip(overlaps) {
                if hit {
                    child.insert(entry, config);
                }
            }
            return;
        }

        self.entries.push(entry);
        if self.entries.len() > config.capacity && self.depth < config.max_depth {
            self.subdivide(config);
        }
    }

    /// Split into four quadrants and push every local entry down into the
    /// children it overlaps.
    fn subdivide(&mut self, config: &QuadtreeConfig) {
        let depth = self.depth + 1;
        let [ne, nw, se, sw] = self.bounds.quadrants();
        self.children = Some(Box::new([
            RegionNode::new(ne, depth),
            RegionNode::new(nw, depth),
            RegionNode::new(se, depth),
            RegionNode::new(sw, depth),
        ]));

        let entries = std::mem::take(&mut self.entries);
        trace!(depth = self.depth, redistributed = entries.len(), "subdividing region node");
        for entry in entries {
            self.insert(entry, config);
        }
    }

    fn collect(&self, area: &Aabb, out: &mut Vec<u32>) {
        out.extend(
            self.entries
                .iter()
                .filter(|entry| entry.shape.intersects(area))
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

    fn occupancy(&self) -> usize {
        let local = self.entries.len();
        match &self.children {
            Some(children) => local + children.iter().map(RegionNode::occupancy).sum::<usize>(),
            None => local,
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

/// Quadtree over rectangular extents.
///
/// # Example
///
/// ```
/// use viewport_index::geometry::{Bounds, Rect};
/// use viewport_index::spatial::{IndexedItem, QuadtreeConfig, RegionQuadtree};
///
/// let bounds = Bounds::from(Rect::new(0.0, 0.0, 100.0, 100.0));
/// let mut tree = RegionQuadtree::new(bounds, QuadtreeConfig::default()).unwrap();
/// tree.insert(IndexedItem::new(1, Rect::new(45.0, 45.0, 10.0, 10.0), "tile"));
///
/// let visible = tree.retrieve(&Rect::new(0.0, 0.0, 50.0, 50.0));
/// assert_eq!(visible.len(), 1);
/// ```
#[derive(Debug)]
pub struct RegionQuadtree<T> {
    root: RegionNode,
    /// Item arena; nodes refer to items by slot.
    items: Vec<ExtentItem<T>>,
    config: QuadtreeConfig,
}

impl<T> RegionQuadtree<T> {
    /// Create an empty tree, validating bounds and configuration.
    pub fn new(bounds: Bounds, config: QuadtreeConfig) -> Result<Self> {
        Self::with_root(bounds.to_root()?, config)
    }

    fn with_root(bounds: Aabb, config: QuadtreeConfig) -> Result<Self> {
        bounds.validate_root()?;
        config.validate()?;
        Ok(Self {
            root: RegionNode::new(bounds, 0),
            items: Vec::new(),
            config,
        })
    }

    /// Insert an item into every node its extent overlaps.
    ///
    /// Items with an invalid extent or lying entirely outside the root
    /// bounds are dropped.
    pub fn insert(&mut self, item: ExtentItem<T>) {
        self.try_insert(item);
    }

    fn try_insert(&mut self, item: ExtentItem<T>) -> bool {
        let extent = item.shape.to_aabb();
        if item.shape.validate().is_err() || !self.root.bounds.intersects(&extent) {
            debug!(id = %item.id, "dropping extent outside index bounds");
            return false;
        }

        let slot = self.items.len() as u32;
        self.items.push(item);
        self.root.insert(Entry { slot, shape: extent }, &self.config);
        true
    }

    /// Unique items whose extent overlaps `area`, in no particular order.
    pub fn retrieve(&self, area: &Rect) -> Vec<&ExtentItem<T>> {
        let area = area.to_aabb();
        let mut slots = Vec::new();
        if self.root.bounds.intersects(&area) {
            self.root.collect(&area, &mut slots);
        }

        let mut seen = HashSet::with_capacity(slots.len());
        slots
            .into_iter()
            .map(|slot| &self.items[slot as usize])
            .filter(|item| seen.insert(item.id))
            .collect()
    }

    /// Identifiers of the unique items overlapping `area`.
    pub fn retrieve_ids(&self, area: &Rect) -> Vec<ItemId> {
        self.retrieve(area).into_iter().map(|item| item.id).collect()
    }

    /// Sum of node-local entries, counting a straddling item once per node
    /// that holds it. This measures storage, not unique items.
    pub fn occupancy_count(&self) -> usize {
        self.root.occupancy()
    }

    /// Storage occupancy; see [`occupancy_count`](Self::occupancy_count).
    /// Use [`len`](Self::len) for the unique item count.
    pub fn size(&self) -> usize {
        self.occupancy_count()
    }

    /// Number of unique items stored.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every node and item, keeping bounds and configuration.
    pub fn clear(&mut self) {
        self.root = RegionNode::new(self.root.bounds, 0);
        self.items.clear();
    }

    /// Stored items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtentItem<T>> {
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

impl<T> SpatialIndex for RegionQuadtree<T> {
    type Shape = Rect;
    type Payload = T;

    fn with_bounds(bounds: Aabb, config: QuadtreeConfig) -> Result<Self> {
        Self::with_root(bounds, config)
    }

    fn insert_item(&mut self, item: ExtentItem<T>) -> bool {
        self.try_insert(item)
    }

    fn query_area(&self, area: &Rect) -> Vec<&ExtentItem<T>> {
        self.retrieve(area)
    }

    fn size(&self) -> usize {
        self.occupancy_count()
    }

    fn clear(&mut self) {
        RegionQuadtree::clear(self)
    }
}
