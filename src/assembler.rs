//! Batch assemblers: the middleware between per-event parsers and the
//! network.
//!
//! [`BatchAssembler`] merges a list of per-event samples into one batched
//! value per key, choosing a strategy from the first event's value kind and
//! running the volume splitter over sparse keys when boundaries are
//! configured. [`DenseBatchAssembler`] is the trivial stacking counterpart
//! for dense tensors.

use indexmap::IndexMap;
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use tracing::debug;

use crate::config::CollateConfig;
use crate::data::{
    BatchedValue, CollatedBatch, DenseBatch, DenseEventSample, EventSample, SampleValue,
    SparsePoints,
};
use crate::errors::CollateError;
use crate::splitter::{apply_permutation, VolumeSplitter};

/// Assembles sparse per-event samples into batched tensors.
///
/// Pure function of its inputs and configuration: geometry is computed once
/// at construction, every `collate` call allocates fresh outputs.
#[derive(Clone, Debug)]
pub struct BatchAssembler {
    splitter: Option<VolumeSplitter>,
}

impl BatchAssembler {
    /// Build an assembler from configuration. Boundaries, when present, are
    /// validated here; a config without them collates with a single
    /// implicit volume and no coordinate rewriting.
    pub fn new(config: CollateConfig) -> Result<Self, CollateError> {
        let splitter = match &config.boundaries {
            Some(_) => {
                let splitter = VolumeSplitter::from_config(&config)?;
                debug!(
                    num_volumes = splitter.num_volumes(),
                    "volume splitting enabled"
                );
                Some(splitter)
            }
            None => None,
        };
        Ok(Self { splitter })
    }

    /// The configured splitter, if boundaries are set. Useful for callers
    /// that need `num_volumes` or `virtual_batch_ids` to decompose model
    /// outputs per volume.
    pub fn splitter(&self) -> Option<&VolumeSplitter> {
        self.splitter.as_ref()
    }

    /// Collate a non-empty list of per-event samples into one batched value
    /// per key.
    ///
    /// The key set and batching strategy per key come from the first event;
    /// later events that disagree on a key's kind (or lack the key) fail
    /// with [`CollateError::Schema`] at the point the disagreement is
    /// encountered. An empty list fails with [`CollateError::EmptyBatch`].
    pub fn collate(&self, batch: &[EventSample]) -> Result<CollatedBatch, CollateError> {
        let first = batch.first().ok_or(CollateError::EmptyBatch)?;
        let mut result = CollatedBatch::with_capacity(first.len());
        for (key, value) in first {
            result.insert(key.clone(), self.collate_key(key, value, batch)?);
        }
        Ok(result)
    }

    fn collate_key(
        &self,
        key: &str,
        first: &SampleValue,
        batch: &[EventSample],
    ) -> Result<BatchedValue, CollateError> {
        match first {
            SampleValue::Sparse(_) => self.collate_sparse(key, batch),
            SampleValue::Scalars(_) => collate_scalars(key, batch),
            SampleValue::Table(_) => collate_tables(key, batch),
            SampleValue::MultiScale(pairs) => collate_multi_scale(key, pairs.len(), batch),
            SampleValue::Opaque(_) => collate_opaque(key, batch),
        }
    }

    /// Strategy (a): sparse `(coordinates, features)` pairs.
    fn collate_sparse(&self, key: &str, batch: &[EventSample]) -> Result<BatchedValue, CollateError> {
        let mut voxel_blocks: Vec<Array2<f64>> = Vec::with_capacity(batch.len());
        let mut feature_blocks: Vec<ArrayView2<'_, f64>> = Vec::with_capacity(batch.len());
        let mut widths: Option<(usize, usize)> = None;
        for (event, sample) in batch.iter().enumerate() {
            let points = match expect_value(key, event, sample, "sparse")? {
                SampleValue::Sparse(points) => points,
                other => return Err(schema(key, event, "sparse", other)),
            };
            check_points(key, event, points, &mut widths)?;
            voxel_blocks.push(with_leading_column(event as f64, points.coordinates.view()));
            feature_blocks.push(points.features.view());
        }

        let voxel_views: Vec<ArrayView2<'_, f64>> =
            voxel_blocks.iter().map(Array2::view).collect();
        let mut voxels = vstack(key, &voxel_views)?;
        let mut features = vstack(key, &feature_blocks)?;

        if let Some(splitter) = &self.splitter {
            let (split_voxels, perm) = splitter.split(voxels.view())?;
            voxels = apply_permutation(split_voxels.view(), &perm);
            features = apply_permutation(features.view(), &perm);
        }

        let combined = hstack(key, voxels.view(), features.view())?;
        Ok(BatchedValue::Tensor(combined))
    }
}

/// Strategy (b): one scalar label per row, batched as `(event_id, value)`.
fn collate_scalars(key: &str, batch: &[EventSample]) -> Result<BatchedValue, CollateError> {
    let mut blocks = Vec::with_capacity(batch.len());
    for (event, sample) in batch.iter().enumerate() {
        let values = match expect_value(key, event, sample, "scalars")? {
            SampleValue::Scalars(values) => values,
            other => return Err(schema(key, event, "scalars", other)),
        };
        let mut block = Array2::zeros((values.len(), 2));
        block.column_mut(0).fill(event as f64);
        block.column_mut(1).assign(values);
        blocks.push(block);
    }
    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(Array2::view).collect();
    Ok(BatchedValue::Tensor(vstack(key, &views)?))
}

/// Strategy (c): 2-D tables without coordinate semantics.
fn collate_tables(key: &str, batch: &[EventSample]) -> Result<BatchedValue, CollateError> {
    let mut blocks = Vec::with_capacity(batch.len());
    let mut width: Option<usize> = None;
    for (event, sample) in batch.iter().enumerate() {
        let table = match expect_value(key, event, sample, "table")? {
            SampleValue::Table(table) => table,
            other => return Err(schema(key, event, "table", other)),
        };
        match width {
            None => width = Some(table.ncols()),
            Some(expected) if expected != table.ncols() => {
                return Err(CollateError::Shape {
                    context: key.into(),
                    expected: format!("{expected} columns"),
                    found: format!("{} columns at event {event}", table.ncols()),
                });
            }
            Some(_) => {}
        }
        blocks.push(with_leading_column(event as f64, table.view()));
    }
    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(Array2::view).collect();
    Ok(BatchedValue::Tensor(vstack(key, &views)?))
}

/// Strategy (d): multi-resolution labels, batched per depth. Volume
/// splitting is not applied on this path; see the crate docs.
fn collate_multi_scale(
    key: &str,
    depths: usize,
    batch: &[EventSample],
) -> Result<BatchedValue, CollateError> {
    let mut per_event: Vec<&[SparsePoints]> = Vec::with_capacity(batch.len());
    for (event, sample) in batch.iter().enumerate() {
        let pairs = match expect_value(key, event, sample, "multi_scale")? {
            SampleValue::MultiScale(pairs) => pairs,
            other => return Err(schema(key, event, "multi_scale", other)),
        };
        if pairs.len() != depths {
            return Err(CollateError::Schema {
                key: key.into(),
                event,
                expected: format!("multi_scale with {depths} depths"),
                found: format!("multi_scale with {} depths", pairs.len()),
            });
        }
        per_event.push(pairs);
    }

    let mut batched = Vec::with_capacity(depths);
    for depth in 0..depths {
        let mut voxel_blocks: Vec<Array2<f64>> = Vec::with_capacity(batch.len());
        let mut feature_blocks: Vec<ArrayView2<'_, f64>> = Vec::with_capacity(batch.len());
        let mut widths: Option<(usize, usize)> = None;
        for (event, pairs) in per_event.iter().enumerate() {
            let points = &pairs[depth];
            check_points(key, event, points, &mut widths)?;
            voxel_blocks.push(with_leading_column(event as f64, points.coordinates.view()));
            feature_blocks.push(points.features.view());
        }
        let voxel_views: Vec<ArrayView2<'_, f64>> =
            voxel_blocks.iter().map(Array2::view).collect();
        let voxels = vstack(key, &voxel_views)?;
        let features = vstack(key, &feature_blocks)?;
        batched.push(hstack(key, voxels.view(), features.view())?);
    }
    Ok(BatchedValue::MultiScale(batched))
}

/// Strategy (e): opaque passthrough.
fn collate_opaque(key: &str, batch: &[EventSample]) -> Result<BatchedValue, CollateError> {
    let mut values = Vec::with_capacity(batch.len());
    for (event, sample) in batch.iter().enumerate() {
        let value = match expect_value(key, event, sample, "opaque")? {
            SampleValue::Opaque(value) => value,
            other => return Err(schema(key, event, "opaque", other)),
        };
        values.push(value.clone());
    }
    Ok(BatchedValue::Opaque(values))
}

fn expect_value<'a>(
    key: &str,
    event: usize,
    sample: &'a EventSample,
    expected: &str,
) -> Result<&'a SampleValue, CollateError> {
    sample.get(key).ok_or_else(|| CollateError::Schema {
        key: key.into(),
        event,
        expected: expected.into(),
        found: "missing".into(),
    })
}

fn schema(key: &str, event: usize, expected: &str, found: &SampleValue) -> CollateError {
    CollateError::Schema {
        key: key.into(),
        event,
        expected: expected.into(),
        found: found.kind().into(),
    }
}

/// Validate one event's sparse pair against the widths fixed by event 0 and
/// the row parallelism between coordinates and features.
fn check_points(
    key: &str,
    event: usize,
    points: &SparsePoints,
    widths: &mut Option<(usize, usize)>,
) -> Result<(), CollateError> {
    if points.coordinates.nrows() != points.features.nrows() {
        return Err(CollateError::Shape {
            context: key.into(),
            expected: format!("{} feature rows", points.coordinates.nrows()),
            found: format!("{} feature rows at event {event}", points.features.nrows()),
        });
    }
    let event_widths = (points.coordinates.ncols(), points.features.ncols());
    match widths {
        None => *widths = Some(event_widths),
        Some(expected) if *expected != event_widths => {
            return Err(CollateError::Shape {
                context: key.into(),
                expected: format!("{} coordinate and {} feature columns", expected.0, expected.1),
                found: format!(
                    "{} coordinate and {} feature columns at event {event}",
                    event_widths.0, event_widths.1
                ),
            });
        }
        Some(_) => {}
    }
    Ok(())
}

/// Prepend a constant column (event id or batch id) to a 2-D block.
fn with_leading_column(fill: f64, block: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = Array2::zeros((block.nrows(), block.ncols() + 1));
    out.column_mut(0).fill(fill);
    out.slice_mut(s![.., 1..]).assign(&block);
    out
}

fn vstack(key: &str, blocks: &[ArrayView2<'_, f64>]) -> Result<Array2<f64>, CollateError> {
    concatenate(Axis(0), blocks).map_err(|err| CollateError::Shape {
        context: key.into(),
        expected: "blocks with matching column counts".into(),
        found: err.to_string(),
    })
}

fn hstack<'a>(
    key: &str,
    voxels: ArrayView2<'a, f64>,
    features: ArrayView2<'a, f64>,
) -> Result<Array2<f64>, CollateError> {
    concatenate(Axis(1), &[voxels, features]).map_err(|err| CollateError::Shape {
        context: key.into(),
        expected: "equal voxel and feature row counts".into(),
        found: err.to_string(),
    })
}

/// Stacks dense per-event tensors along a new leading event axis.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseBatchAssembler;

impl DenseBatchAssembler {
    /// Build a dense assembler (no configuration needed).
    pub fn new() -> Self {
        Self
    }

    /// Stack every key's per-event arrays into one array with a leading
    /// event axis. All events must hold the same shape per key; a mismatch
    /// fails with [`CollateError::Shape`], a missing key with
    /// [`CollateError::Schema`], and an empty list with
    /// [`CollateError::EmptyBatch`].
    pub fn collate(&self, batch: &[DenseEventSample]) -> Result<DenseBatch, CollateError> {
        let first = batch.first().ok_or(CollateError::EmptyBatch)?;
        let mut result = IndexMap::with_capacity(first.len());
        for (key, first_value) in first {
            let mut views = Vec::with_capacity(batch.len());
            for (event, sample) in batch.iter().enumerate() {
                let value = sample.get(key).ok_or_else(|| CollateError::Schema {
                    key: key.clone(),
                    event,
                    expected: "dense array".into(),
                    found: "missing".into(),
                })?;
                if value.shape() != first_value.shape() {
                    return Err(CollateError::Shape {
                        context: key.clone(),
                        expected: format!("shape {:?}", first_value.shape()),
                        found: format!("shape {:?} at event {event}", value.shape()),
                    });
                }
                views.push(value.view());
            }
            let stacked = ndarray::stack(Axis(0), &views).map_err(|err| CollateError::Shape {
                context: key.clone(),
                expected: "uniform per-event shapes".into(),
                found: err.to_string(),
            })?;
            result.insert(key.clone(), stacked);
        }
        Ok(result)
    }
}
