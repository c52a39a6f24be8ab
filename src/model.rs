//! Capability traits for the downstream network and loss.
//!
//! The convolution stacks themselves live outside this crate; the batching
//! layer only needs a seam to hand batched tensors across. Implementations
//! consume `(virtual_batch_id, coordinates.., features..)` tensors produced
//! by [`BatchAssembler`](crate::assembler::BatchAssembler) and must keep
//! the row order untouched so outputs stay voxel-aligned with labels.

use ndarray::{Array2, ArrayView2};

use crate::errors::CollateError;

/// A sparse network: given one batched voxel+feature tensor, return one
/// output row per voxel, in the same row order.
pub trait SparseModel {
    /// Run the network over a batched sparse tensor.
    fn per_voxel_outputs(&self, voxels: ArrayView2<'_, f64>) -> Result<Array2<f64>, CollateError>;
}

/// A loss consuming per-voxel model outputs plus a label tensor collated
/// with the same ordering convention, so rows align without a matching
/// step.
pub trait SparseLoss {
    /// Evaluate the loss over aligned output and label rows.
    fn evaluate(
        &self,
        outputs: ArrayView2<'_, f64>,
        labels: ArrayView2<'_, f64>,
    ) -> Result<f64, CollateError>;
}
