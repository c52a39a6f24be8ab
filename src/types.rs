/// Boundary cuts along one spatial axis, sorted ascending at construction.
/// `None` means the axis is not split.
/// Example: `Some(vec![1376.3])` splits an axis into two volumes.
pub type AxisCuts = Option<Vec<f64>>;
/// Full boundary specification, one entry per spatial axis.
/// Example: `vec![Some(vec![1376.3]), None, None]`
pub type BoundarySpec = Vec<AxisCuts>;
/// Index of a sub-volume within the geometry enumeration.
/// Ranges over `0..num_volumes`.
pub type VolumeId = usize;
/// Zero-based index of an event within one collation call.
pub type EventId = usize;
/// Batch id column value after splitting: `volume + event * num_volumes`.
/// Reinterpretable as `(event, volume)` by division/modulo by `num_volumes`.
pub type VirtualBatchId = usize;
