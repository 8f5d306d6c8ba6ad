//! Viewport Index - WASM Module
//!
//! Quadtree spatial indexing for viewport virtualization. A host render loop
//! stores tens of thousands of markers or tiles and asks, every frame, for
//! the subset overlapping the visible rectangle. The crate compiles to
//! WebAssembly and exposes a JavaScript-friendly API via wasm-bindgen; the
//! same types are usable directly from Rust.
//!
//! # Architecture
//!
//! - `geometry`: points, rectangles and geographic bounds
//! - `spatial`: region (extent) and point quadtrees
//! - `build`: chunked, cancellable construction that yields to the host
//!   scheduler between chunks

use js_sys::{Array, Function};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub mod build;
mod console;
pub mod error;
pub mod geometry;
pub mod spatial;

use build::{BuildConfig, BuildOutcome, BuildProgress, IdleCallbackScheduler, ProgressiveIndexBuilder};
use geometry::{Bounds, LatLng, Point, Rect};
use spatial::{IndexedItem, PointQuadtree, QuadtreeConfig, RegionQuadtree, SpatialIndex};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_bounds(bounds: JsValue) -> Result<Bounds, JsValue> {
    serde_wasm_bindgen::from_value(bounds).map_err(to_js_error)
}

/// Missing options (`undefined` or `null`) fall back to defaults.
fn parse_options<T: DeserializeOwned + Default>(options: JsValue) -> Result<T, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(options).map_err(to_js_error)
}

// =========================================================================
// Region Index
// =========================================================================

/// Rectangle-overlap index exposed to JavaScript as `RegionIndex`.
///
/// Payloads are arbitrary JS values handed back by `query`.
#[wasm_bindgen(js_name = RegionIndex)]
pub struct RegionIndexWasm {
    tree: RegionQuadtree<JsValue>,
}

#[wasm_bindgen(js_class = RegionIndex)]
impl RegionIndexWasm {
    /// Create an empty index.
    ///
    /// # Arguments
    ///
    /// * `bounds` - `{x, y, width, height}` or `{north, south, east, west}`
    /// * `options` - optional `{capacity, maxDepth}`
    #[wasm_bindgen(constructor)]
    pub fn new(bounds: JsValue, options: JsValue) -> Result<RegionIndexWasm, JsValue> {
        let bounds = parse_bounds(bounds)?;
        let config: QuadtreeConfig = parse_options(options)?;
        let tree = RegionQuadtree::new(bounds, config).map_err(to_js_error)?;
        Ok(Self { tree })
    }

    /// Insert an extent. Extents entirely outside the bounds are dropped.
    pub fn insert(&mut self, id: u32, x: f64, y: f64, width: f64, height: f64, payload: JsValue) {
        self.tree
            .insert(IndexedItem::new(id, Rect::new(x, y, width, height), payload));
    }

    /// Payloads of the unique items overlapping the rectangle.
    pub fn query(&self, x: f64, y: f64, width: f64, height: f64) -> Array {
        self.tree
            .retrieve(&Rect::new(x, y, width, height))
            .into_iter()
            .map(|item| item.payload.clone())
            .collect()
    }

    /// IDs of the unique items overlapping the rectangle.
    #[wasm_bindgen(js_name = queryIds)]
    pub fn query_ids(&self, x: f64, y: f64, width: f64, height: f64) -> Vec<u32> {
        self.tree
            .retrieve_ids(&Rect::new(x, y, width, height))
            .into_iter()
            .map(u32::from)
            .collect()
    }

    /// Storage occupancy, counting straddling items once per node.
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    #[wasm_bindgen(js_name = occupancyCount)]
    pub fn occupancy_count(&self) -> usize {
        self.tree.occupancy_count()
    }

    /// Number of unique items stored.
    #[wasm_bindgen(js_name = uniqueCount)]
    pub fn unique_count(&self) -> usize {
        self.tree.len()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }
}

// =========================================================================
// Point Index
// =========================================================================

/// Point-containment index exposed to JavaScript as `PointIndex`.
#[wasm_bindgen(js_name = PointIndex)]
pub struct PointIndexWasm {
    tree: PointQuadtree<JsValue>,
}

#[wasm_bindgen(js_class = PointIndex)]
impl PointIndexWasm {
    #[wasm_bindgen(constructor)]
    pub fn new(bounds: JsValue, options: JsValue) -> Result<PointIndexWasm, JsValue> {
        let bounds = parse_bounds(bounds)?;
        let config: QuadtreeConfig = parse_options(options)?;
        let tree = PointQuadtree::new(bounds, config).map_err(to_js_error)?;
        Ok(Self { tree })
    }

    /// Insert a point. Returns false if it lies outside the bounds.
    pub fn insert(&mut self, id: u32, x: f64, y: f64, payload: JsValue) -> bool {
        self.tree.insert(IndexedItem::new(id, Point::new(x, y), payload))
    }

    /// Insert a geographic point.
    #[wasm_bindgen(js_name = insertLatLng)]
    pub fn insert_lat_lng(&mut self, id: u32, lat: f64, lng: f64, payload: JsValue) -> bool {
        let point = Point::from(LatLng::new(lat, lng));
        self.tree.insert(IndexedItem::new(id, point, payload))
    }

    /// Payloads of the items inside `bounds` (either form).
    pub fn query(&self, bounds: JsValue) -> Result<Array, JsValue> {
        let area = Rect::from(parse_bounds(bounds)?.to_aabb());
        Ok(self
            .tree
            .query(&area)
            .into_iter()
            .map(|item| item.payload.clone())
            .collect())
    }

    #[wasm_bindgen(js_name = queryIds)]
    pub fn query_ids(&self, bounds: JsValue) -> Result<Vec<u32>, JsValue> {
        let area = Rect::from(parse_bounds(bounds)?.to_aabb());
        Ok(self.tree.query_ids(&area).into_iter().map(u32::from).collect())
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }
}

// =========================================================================
// Progressive Build
// =========================================================================

/// A point record as supplied by JS: `{id, x, y}` or `{id, lat, lng}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointRecord {
    Cartesian { id: u32, x: f64, y: f64 },
    Geographic { id: u32, lat: f64, lng: f64 },
}

impl PointRecord {
    fn into_parts(self) -> (u32, Point) {
        match self {
            PointRecord::Cartesian { id, x, y } => (id, Point::new(x, y)),
            PointRecord::Geographic { id, lat, lng } => (id, LatLng::new(lat, lng).into()),
        }
    }
}

/// An extent record as supplied by JS: `{id, x, y, width, height}`.
#[derive(Debug, Deserialize)]
struct ExtentRecord {
    id: u32,
    #[serde(flatten)]
    extent: Rect,
}

/// Parse JS item objects, keeping each whole object as its payload.
/// Malformed records are skipped with a console warning.
fn parse_items<R, S>(items: &Array, into_parts: impl Fn(R) -> (u32, S)) -> Vec<IndexedItem<S, JsValue>>
where
    R: DeserializeOwned,
{
    let mut parsed = Vec::with_capacity(items.length() as usize);
    for (position, value) in items.iter().enumerate() {
        match serde_wasm_bindgen::from_value::<R>(value.clone()) {
            Ok(record) => {
                let (id, shape) = into_parts(record);
                parsed.push(IndexedItem::new(id, shape, value));
            }
            Err(err) => console_warn!("Skipping malformed item at {}: {}", position, err),
        }
    }
    parsed
}

fn notify(callback: &Function, progress: &BuildProgress<'_>) {
    let args = Array::new();
    args.push(&JsValue::from_f64(progress.processed as f64));
    args.push(&JsValue::from_f64(progress.total as f64));
    args.push(&JsValue::from_f64(progress.percent as f64));
    args.push(&JsValue::from_str(progress.stage));
    if let Err(err) = callback.apply(&JsValue::NULL, &args) {
        console_warn!("Progress callback threw: {:?}", err);
    }
}

async fn run_build<I>(
    items: Vec<IndexedItem<I::Shape, I::Payload>>,
    bounds: Bounds,
    config: BuildConfig,
    on_progress: Option<Function>,
    signal: Option<web_sys::AbortSignal>,
) -> Result<BuildOutcome<I>, JsValue>
where
    I: SpatialIndex,
{
    let mut builder: ProgressiveIndexBuilder<'_, I, _> =
        ProgressiveIndexBuilder::new(IdleCallbackScheduler, config);
    if let Some(callback) = on_progress {
        builder = builder.on_progress(move |progress, _| notify(&callback, progress));
    }
    if let Some(signal) = signal {
        builder = builder.with_cancellation(signal);
    }

    let outcome = builder.build(items, bounds).await.map_err(to_js_error)?;
    if !outcome.is_complete() {
        console_log!(
            "Index build '{}' cancelled after {} of {} items",
            builder.config().stage,
            outcome.processed,
            outcome.total
        );
    }
    Ok(outcome)
}

/// Build a point index progressively, yielding to the browser between chunks.
///
/// # Arguments
///
/// * `items` - `[{id, x, y, ...}]` or `[{id, lat, lng, ...}]`; each object
///   becomes the payload
/// * `bounds` - `{x, y, width, height}` or `{north, south, east, west}`
/// * `options` - optional `{chunkSize, stage, capacity, maxDepth}`
/// * `on_progress` - optional `(processed, total, percent, stage) => void`
/// * `signal` - optional `AbortSignal`; an aborted build resolves with the
///   partial index
#[wasm_bindgen(js_name = buildPointIndex)]
pub async fn build_point_index(
    items: Array,
    bounds: JsValue,
    options: JsValue,
    on_progress: Option<Function>,
    signal: Option<web_sys::AbortSignal>,
) -> Result<PointIndexWasm, JsValue> {
    let bounds = parse_bounds(bounds)?;
    let config: BuildConfig = parse_options(options)?;
    let items = parse_items(&items, PointRecord::into_parts);
    let outcome = run_build::<PointQuadtree<JsValue>>(items, bounds, config, on_progress, signal).await?;
    Ok(PointIndexWasm { tree: outcome.index })
}

/// Build a region index progressively. Items are `[{id, x, y, width, height, ...}]`.
#[wasm_bindgen(js_name = buildRegionIndex)]
pub async fn build_region_index(
    items: Array,
    bounds: JsValue,
    options: JsValue,
    on_progress: Option<Function>,
    signal: Option<web_sys::AbortSignal>,
) -> Result<RegionIndexWasm, JsValue> {
    let bounds = parse_bounds(bounds)?;
    let config: BuildConfig = parse_options(options)?;
    let items = parse_items(&items, |record: ExtentRecord| (record.id, record.extent));
    let outcome = run_build::<RegionQuadtree<JsValue>>(items, bounds, config, on_progress, signal).await?;
    Ok(RegionIndexWasm { tree: outcome.index })
}
