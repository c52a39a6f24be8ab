use thiserror::Error;

/// Error type for collation configuration and batching failures.
///
/// All variants are raised synchronously at the point of detection and are
/// fatal for the batch at hand; this layer has no transient-failure notion.
#[derive(Debug, Error)]
pub enum CollateError {
    /// Malformed boundary definition for one spatial axis.
    #[error("invalid boundary definition for axis {axis}: {reason}")]
    Configuration {
        /// Axis whose definition failed validation.
        axis: usize,
        /// Human-readable validation failure.
        reason: String,
    },
    /// Array rank or axis-length mismatch.
    #[error("shape mismatch in '{context}': expected {expected}, found {found}")]
    Shape {
        /// Where the mismatch was detected (key name or operation).
        context: String,
        /// Expected rank or axis length.
        expected: String,
        /// Observed rank or axis length.
        found: String,
    },
    /// Volume index outside `[0, num_volumes)`.
    #[error("volume index {volume} out of range (num_volumes = {num_volumes})")]
    Range {
        /// Offending volume index.
        volume: usize,
        /// Number of volumes in the geometry.
        num_volumes: usize,
    },
    /// Per-key value kind disagreement across events in one batch.
    #[error("key '{key}': event {event} has kind '{found}', expected '{expected}' from event 0")]
    Schema {
        /// Key whose values disagree.
        key: String,
        /// Index of the offending event.
        event: usize,
        /// Kind chosen from the first event.
        expected: String,
        /// Kind observed on the offending event.
        found: String,
    },
    /// Zero-length batch handed to an assembler.
    #[error("cannot collate an empty batch")]
    EmptyBatch,
}
