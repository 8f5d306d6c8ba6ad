//! Item identity and the records stored in an index.
//!
//! Every indexed item has:
//! - A stable unique identifier, used to deduplicate query results
//! - A shape: a [`Rect`] extent or a [`Point`]
//! - An opaque payload handed back to the caller on query

use std::fmt;

use crate::geometry::{Point, Rect};

/// Stable item identifier.
///
/// Wraps a u32 for compact storage and WebAssembly interop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u32);

impl ItemId {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item({})", self.0)
    }
}

impl From<u32> for ItemId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ItemId> for u32 {
    #[inline]
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// An item with an identifier, a shape and a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem<S, T> {
    pub id: ItemId,
    pub shape: S,
    pub payload: T,
}

impl<S, T> IndexedItem<S, T> {
    pub fn new(id: impl Into<ItemId>, shape: S, payload: T) -> Self {
        Self {
            id: id.into(),
            shape,
            payload,
        }
    }
}

/// An item with a rectangular extent, stored in a
/// [`RegionQuadtree`](super::RegionQuadtree).
pub type ExtentItem<T> = IndexedItem<Rect, T>;

/// An item located at a single point, stored in a
/// [`PointQuadtree`](super::PointQuadtree).
pub type PointItem<T> = IndexedItem<Point, T>;

/// What a node actually holds: an arena slot plus a cached copy of the
/// shape, so subdivision never has to look the item up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry<S> {
    pub slot: u32,
    pub shape: S,
}
