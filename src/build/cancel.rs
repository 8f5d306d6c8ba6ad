//! Cooperative cancellation.
//!
//! [`AbortController`] and [`AbortSignal`] mirror the DOM pair of the same
//! name: the caller keeps the controller and hands the signal to a build.
//! The builder polls it between chunks only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Anything a build can poll to learn it should stop.
pub trait CancellationSource {
    fn is_cancelled(&self) -> bool;
}

/// Owner side of a cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    flag: Arc<AtomicBool>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            flag: Arc::clone(&self.flag),
        }
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Observer side of a cancellation flag.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl CancellationSource for AbortSignal {
    fn is_cancelled(&self) -> bool {
        self.aborted()
    }
}

impl CancellationSource for web_sys::AbortSignal {
    fn is_cancelled(&self) -> bool {
        self.aborted()
    }
}
