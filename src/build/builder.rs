//! Chunked, cancellable index construction.
//!
//! A build runs through `Idle → Building → {Completed | Cancelled | Failed}`:
//!
//! 1. **Validate:** bounds, node capacity and chunk size. Any failure ends the
//!    build in `Failed` before an index exists.
//! 2. **Insert a chunk:** up to `chunk_size` items go in synchronously, so a
//!    reader never sees a half-applied insert.
//! 3. **Report:** the progress callback receives the counters and a shared
//!    reference to the partial index, which is valid and queryable.
//! 4. **Yield:** the scheduler suspends the build before the next chunk.
//!
//! Cancellation is checked before and after every chunk. A cancelled build
//! still returns its partial index.

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use super::cancel::CancellationSource;
use super::scheduler::Scheduler;
use crate::error::{IndexError, Result};
use crate::geometry::{Aabb, Bounds};
use crate::spatial::{IndexedItem, QuadtreeConfig, SpatialIndex};

/// Lifecycle of a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Building,
    Completed,
    Cancelled,
    Failed,
}

/// How a successful build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Completed,
    Cancelled,
}

/// Build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    /// Items inserted between yields.
    pub chunk_size: usize,
    /// Progress channel name reported with every notification.
    pub stage: String,
    /// Node capacity of the index being built.
    pub capacity: usize,
    /// Maximum subdivision depth of the index being built.
    pub max_depth: u32,
}

impl BuildConfig {
    pub fn tree_config(&self) -> QuadtreeConfig {
        QuadtreeConfig::new(self.capacity, self.max_depth)
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_tree(mut self, tree: QuadtreeConfig) -> Self {
        self.capacity = tree.capacity;
        self.max_depth = tree.max_depth;
        self
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        let tree = QuadtreeConfig::default();
        Self {
            chunk_size: 500,
            stage: "index".to_string(),
            capacity: tree.capacity,
            max_depth: tree.max_depth,
        }
    }
}

/// A progress notification, sent after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProgress<'a> {
    pub processed: usize,
    pub total: usize,
    /// `processed / total` as a rounded percentage.
    pub percent: u32,
    pub stage: &'a str,
}

/// Result of a build that passed validation.
#[derive(Debug)]
pub struct BuildOutcome<I> {
    pub index: I,
    pub status: BuildStatus,
    /// Items handed to the index, accepted or not.
    pub processed: usize,
    /// Items the index refused (outside its bounds).
    pub rejected: usize,
    pub total: usize,
}

impl<I> BuildOutcome<I> {
    pub fn is_complete(&self) -> bool {
        self.status == BuildStatus::Completed
    }
}

type ProgressFn<'a, I> = Box<dyn FnMut(&BuildProgress<'_>, &I) + 'a>;

/// Drives chunked insertion into a [`SpatialIndex`].
///
/// The builder owns the index while it is being built; readers observe it
/// between chunks through the progress callback.
pub struct ProgressiveIndexBuilder<'a, I, S> {
    scheduler: S,
    config: BuildConfig,
    on_progress: Option<ProgressFn<'a, I>>,
    cancellation: Option<Box<dyn CancellationSource + 'a>>,
    state: BuildState,
}

impl<'a, I, S> ProgressiveIndexBuilder<'a, I, S>
where
    I: SpatialIndex,
    S: Scheduler,
{
    pub fn new(scheduler: S, config: BuildConfig) -> Self {
        Self {
            scheduler,
            config,
            on_progress: None,
            cancellation: None,
            state: BuildState::Idle,
        }
    }

    /// Register a callback invoked after every chunk.
    pub fn on_progress(mut self, callback: impl FnMut(&BuildProgress<'_>, &I) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Register a source polled between chunks.
    pub fn with_cancellation(mut self, source: impl CancellationSource + 'a) -> Self {
        self.cancellation = Some(Box::new(source));
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build an index over `bounds` from `items`.
    ///
    /// Returns `Err` only for invalid configuration. A cancelled build
    /// returns `Ok` with [`BuildStatus::Cancelled`] and the partial index.
    pub async fn build(
        &mut self,
        items: Vec<IndexedItem<I::Shape, I::Payload>>,
        bounds: Bounds,
    ) -> Result<BuildOutcome<I>> {
        self.state = BuildState::Building;
        let root = self.validate(&bounds)?;
        let index = self.create_index(root)?;
        let stage = self.config.stage.clone();
        Ok(self.run(index, items, &stage).await)
    }

    /// Build one independent index per category, one after another, each
    /// reporting progress under its own stage name.
    ///
    /// Once the cancellation source fires, the current and all remaining
    /// categories finish as cancelled.
    pub async fn build_each(
        &mut self,
        groups: Vec<(String, Vec<IndexedItem<I::Shape, I::Payload>>)>,
        bounds: Bounds,
    ) -> Result<Vec<(String, BuildOutcome<I>)>> {
        self.state = BuildState::Building;
        let root = self.validate(&bounds)?;

        let mut outcomes = Vec::with_capacity(groups.len());
        let mut any_cancelled = false;
        for (stage, items) in groups {
            let index = self.create_index(root)?;
            let outcome = self.run(index, items, &stage).await;
            any_cancelled |= outcome.status == BuildStatus::Cancelled;
            outcomes.push((stage, outcome));
        }

        if any_cancelled {
            self.state = BuildState::Cancelled;
        }
        Ok(outcomes)
    }

    fn validate(&mut self, bounds: &Bounds) -> Result<Aabb> {
        let checked = if self.config.chunk_size == 0 {
            Err(IndexError::InvalidChunkSize)
        } else {
            self.config
                .tree_config()
                .validate()
                .and_then(|_| bounds.to_root())
        };
        checked.inspect_err(|err| self.fail(err))
    }

    fn create_index(&mut self, root: Aabb) -> Result<I> {
        I::with_bounds(root, self.config.tree_config()).inspect_err(|err| self.fail(err))
    }

    fn fail(&mut self, err: &IndexError) {
        warn!(stage = %self.config.stage, error = %err, "index build rejected");
        self.state = BuildState::Failed;
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|source| source.is_cancelled())
    }

    async fn run(
        &mut self,
        mut index: I,
        items: Vec<IndexedItem<I::Shape, I::Payload>>,
        stage: &str,
    ) -> BuildOutcome<I> {
        self.state = BuildState::Building;
        let total = items.len();
        let chunk_size = self.config.chunk_size;
        let mut items = items.into_iter();
        let mut processed = 0;
        let mut rejected = 0;

        let status = loop {
            if processed == total {
                break BuildStatus::Completed;
            }
            if self.is_cancelled() {
                break BuildStatus::Cancelled;
            }

            for item in items.by_ref().take(chunk_size) {
                if !index.insert_item(item) {
                    rejected += 1;
                }
                processed += 1;
            }
            trace!(stage, processed, total, "chunk inserted");

            if self.is_cancelled() {
                break BuildStatus::Cancelled;
            }

            if let Some(callback) = self.on_progress.as_mut() {
                let progress = BuildProgress {
                    processed,
                    total,
                    percent: percent(processed, total),
                    stage,
                };
                callback(&progress, &index);
            }

            if processed < total {
                self.scheduler.yield_now().await;
            }
        };

        self.state = match status {
            BuildStatus::Completed => BuildState::Completed,
            BuildStatus::Cancelled => BuildState::Cancelled,
        };
        info!(stage, processed, total, rejected, ?status, "index build finished");

        BuildOutcome {
            index,
            status,
            processed,
            rejected,
            total,
        }
    }
}

fn percent(processed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u32
}
