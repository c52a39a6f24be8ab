#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Batch assemblers for sparse and dense per-event samples.
pub mod assembler;
/// Collation configuration types.
pub mod config;
/// Per-event sample values and batched outputs.
pub mod data;
/// Sub-volume enumeration and coordinate shift tables.
pub mod geometry;
/// Occupancy metrics for collated batches.
pub mod metrics;
/// Capability traits for the downstream network and loss.
pub mod model;
/// Voxel classification and coordinate shifting across volume boundaries.
pub mod splitter;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assembler::{BatchAssembler, DenseBatchAssembler};
pub use config::CollateConfig;
pub use data::{
    BatchedValue, CollatedBatch, DenseBatch, DenseEventSample, EventSample, SampleValue,
    SparsePoints,
};
pub use errors::CollateError;
pub use geometry::VolumeGeometry;
pub use metrics::{volume_occupancy, VolumeOccupancy, VolumeShare};
pub use model::{SparseLoss, SparseModel};
pub use splitter::{apply_permutation, VolumeSplitter};
pub use types::{AxisCuts, BoundarySpec, EventId, VirtualBatchId, VolumeId};
