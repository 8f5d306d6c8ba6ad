//! Progressive, non-blocking index construction.
//!
//! Large datasets are inserted in fixed-size chunks with a yield to the host
//! scheduler between chunks, so a render loop stays responsive while tens of
//! thousands of items are indexed.

mod builder;
mod cancel;
mod scheduler;

pub use builder::{
    BuildConfig, BuildOutcome, BuildProgress, BuildState, BuildStatus, ProgressiveIndexBuilder,
};
pub use cancel::{AbortController, AbortSignal, CancellationSource};
pub use scheduler::{CooperativeScheduler, IdleCallbackScheduler, Scheduler};
