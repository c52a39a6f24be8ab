//! Per-event sample values and batched outputs.

use indexmap::IndexMap;
use ndarray::{Array1, Array2, ArrayD};

/// Paired sparse tensor: voxel coordinates and their parallel feature rows.
///
/// Rows are kept in lockstep under any reordering; `coordinates` has shape
/// `(n, dim)` and `features` shape `(n, f)`.
#[derive(Clone, Debug)]
pub struct SparsePoints {
    /// Voxel-grid coordinates, one row per voxel.
    pub coordinates: Array2<f64>,
    /// Feature rows parallel to `coordinates`.
    pub features: Array2<f64>,
}

impl SparsePoints {
    /// Bundle a coordinate block with its parallel features.
    pub fn new(coordinates: Array2<f64>, features: Array2<f64>) -> Self {
        Self {
            coordinates,
            features,
        }
    }
}

/// One parser output value for a single event.
///
/// The variant determines the batching strategy; all events in a batch must
/// agree on the variant per key.
#[derive(Clone, Debug)]
pub enum SampleValue {
    /// Sparse `(coordinates, features)` pair, batched into one
    /// `(total_voxels, 1 + dim + f)` tensor with volume splitting applied
    /// when configured.
    Sparse(SparsePoints),
    /// One scalar label per row; batched as `(event_id, value)` columns.
    Scalars(Array1<f64>),
    /// A 2-D table without coordinate semantics (e.g. a particle graph);
    /// batched with a prepended event-id column.
    Table(Array2<f64>),
    /// Multi-resolution labels, one `(coordinates, features)` pair per
    /// network depth. Batched per depth; volume splitting is deliberately
    /// not applied on this path (deprecated labels predating multi-volume
    /// support).
    MultiScale(Vec<SparsePoints>),
    /// Passed through untouched into an ordered sequence.
    Opaque(serde_json::Value),
}

impl SampleValue {
    /// Stable kind name used in schema mismatch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SampleValue::Sparse(_) => "sparse",
            SampleValue::Scalars(_) => "scalars",
            SampleValue::Table(_) => "table",
            SampleValue::MultiScale(_) => "multi_scale",
            SampleValue::Opaque(_) => "opaque",
        }
    }
}

/// One event's parser output: key → value, in parser key order.
pub type EventSample = IndexMap<String, SampleValue>;

/// One event's dense parser output: key → fixed-shape array.
pub type DenseEventSample = IndexMap<String, ArrayD<f64>>;

/// Batched value for one key.
#[derive(Clone, Debug)]
pub enum BatchedValue {
    /// One combined 2-D tensor. For sparse keys the columns are
    /// `(virtual_batch_id, coordinates.., features..)`; for label keys the
    /// leading column is the event id.
    Tensor(Array2<f64>),
    /// One batched tensor per network depth, outermost index = depth.
    MultiScale(Vec<Array2<f64>>),
    /// Values collected into a plain ordered sequence, one per event.
    Opaque(Vec<serde_json::Value>),
}

impl BatchedValue {
    /// The combined tensor, if this key batched into one.
    pub fn as_tensor(&self) -> Option<&Array2<f64>> {
        match self {
            BatchedValue::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }
}

/// Batched output for the downstream network: key → batched value, key
/// order preserved from the first event.
pub type CollatedBatch = IndexMap<String, BatchedValue>;

/// Batched dense output: key → array with a leading event axis.
pub type DenseBatch = IndexMap<String, ArrayD<f64>>;
