// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Oracle output that cannot be turned into a hand: unknown label or missing keypoint.
    #[error("malformed detection: {0}")]
    MalformedDetection(String),

    #[error("row has {actual} fields, header has {expected}")]
    Schema { expected: usize, actual: usize },

    #[error("failed to write CSV row: {0}")]
    Sink(#[from] csv::Error),

    #[error("frame source error: {0}")]
    Source(String),

    #[error("hand landmark detector error: {0}")]
    Oracle(String),
}
