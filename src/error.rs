//! Index error types.

use thiserror::Error;

/// Errors raised when an index or a build is configured with invalid input.
///
/// Rejected inserts and cancelled builds are not errors: the former are
/// reported through a `false` return, the latter through
/// [`BuildStatus::Cancelled`](crate::build::BuildStatus::Cancelled).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("Bounds are inverted: {0}")]
    InvertedBounds(String),

    #[error("Bounds have zero area: width={width}, height={height}")]
    DegenerateBounds { width: f64, height: f64 },

    #[error("Bounds contain a non-finite coordinate")]
    NonFiniteBounds,

    #[error("Node capacity must be positive")]
    InvalidCapacity,

    #[error("Maximum depth {max_depth} exceeds the limit of {limit}")]
    InvalidMaxDepth { max_depth: u32, limit: u32 },

    #[error("Chunk size must be positive")]
    InvalidChunkSize,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, IndexError>;
