//! Voxel classification and coordinate shifting across volume boundaries.
//!
//! [`VolumeSplitter`] assigns every voxel of a batched `(batch_id, coords)`
//! array to exactly one sub-volume, rewrites the batch id column to virtual
//! batch ids, shifts coordinates into volume-local space, and produces the
//! permutation that restores the ordering convention used by label tensors.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis};

use crate::config::CollateConfig;
use crate::errors::CollateError;
use crate::geometry::VolumeGeometry;
use crate::types::VolumeId;

/// Splits batched voxels across detector sub-volumes.
///
/// Holds an immutable [`VolumeGeometry`] computed once per configuration,
/// or none at all, in which case the volume count is 1 and every operation
/// degenerates to a relabeling passthrough. Never mutated after
/// construction, so one instance can be shared read-only across workers.
#[derive(Clone, Debug)]
pub struct VolumeSplitter {
    geometry: Option<VolumeGeometry>,
}

impl VolumeSplitter {
    /// Splitter over an explicit geometry.
    pub fn new(geometry: VolumeGeometry) -> Self {
        Self {
            geometry: Some(geometry),
        }
    }

    /// Splitter with no boundaries: a single implicit volume.
    pub fn passthrough() -> Self {
        Self { geometry: None }
    }

    /// Build a splitter from configuration. A config without a `boundaries`
    /// key yields the passthrough splitter.
    pub fn from_config(config: &CollateConfig) -> Result<Self, CollateError> {
        match &config.boundaries {
            Some(boundaries) => Ok(Self::new(VolumeGeometry::new(boundaries.clone())?)),
            None => Ok(Self::passthrough()),
        }
    }

    /// The underlying geometry, if boundaries are configured.
    pub fn geometry(&self) -> Option<&VolumeGeometry> {
        self.geometry.as_ref()
    }

    /// Number of sub-volumes (1 without boundaries).
    pub fn num_volumes(&self) -> usize {
        self.geometry.as_ref().map_or(1, VolumeGeometry::num_volumes)
    }

    /// Move volume-local coordinates back into the detector range of the
    /// given volume by adding its per-axis shifts. Inverse of
    /// [`Self::untranslate`].
    ///
    /// `coords` may have any rank ≥ 1 as long as the trailing axis has
    /// length `dim`; a bare `(dim,)` coordinate works. Fails with
    /// [`CollateError::Range`] for a volume outside `[0, num_volumes)` and
    /// [`CollateError::Shape`] on a trailing-axis mismatch.
    pub fn translate(
        &self,
        coords: ArrayViewD<'_, f64>,
        volume: VolumeId,
    ) -> Result<ArrayD<f64>, CollateError> {
        self.shifted(coords, volume, 1.0)
    }

    /// Move detector-range coordinates into the local range of the given
    /// volume by subtracting its per-axis shifts. Inverse of
    /// [`Self::translate`].
    pub fn untranslate(
        &self,
        coords: ArrayViewD<'_, f64>,
        volume: VolumeId,
    ) -> Result<ArrayD<f64>, CollateError> {
        self.shifted(coords, volume, -1.0)
    }

    fn shifted(
        &self,
        coords: ArrayViewD<'_, f64>,
        volume: VolumeId,
        sign: f64,
    ) -> Result<ArrayD<f64>, CollateError> {
        if volume >= self.num_volumes() {
            return Err(CollateError::Range {
                volume,
                num_volumes: self.num_volumes(),
            });
        }
        let Some(geometry) = &self.geometry else {
            return Ok(coords.to_owned());
        };
        let dim = geometry.dim();
        let trailing = coords.shape().last().copied().unwrap_or(0);
        if coords.ndim() == 0 || trailing != dim {
            return Err(CollateError::Shape {
                context: "translate".into(),
                expected: format!("trailing axis of length {dim}"),
                found: format!("shape {:?}", coords.shape()),
            });
        }

        let bins = geometry.bins_for(volume).to_vec();
        let mut out = coords.to_owned();
        let lane_axis = Axis(out.ndim() - 1);
        for mut lane in out.lanes_mut(lane_axis) {
            for axis in 0..dim {
                // Shifts are applied in whole voxel units.
                lane[axis] += sign * geometry.shift_for(axis, bins[axis]).trunc();
            }
        }
        Ok(out)
    }

    /// Split a batched `(N, dim+1)` voxel array across sub-volumes.
    ///
    /// Column 0 holds the original batch id, columns `1..=dim` the
    /// coordinates. Every row is assigned to exactly one sub-volume;
    /// column 0 becomes `volume + original_batch_id * num_volumes` and the
    /// volume's shifts are subtracted from the coordinates.
    ///
    /// Returns the rewritten array (not yet reordered) and the permutation
    /// that sorts it lexicographically with the last spatial coordinate as
    /// the most significant key and the virtual batch id as the least
    /// significant — the convention label tensors are stored in. The caller
    /// must apply the same permutation to any parallel feature tensor, see
    /// [`apply_permutation`].
    pub fn split(
        &self,
        voxels: ArrayView2<'_, f64>,
    ) -> Result<(Array2<f64>, Vec<usize>), CollateError> {
        let Some(geometry) = &self.geometry else {
            if voxels.ncols() == 0 {
                return Err(CollateError::Shape {
                    context: "split".into(),
                    expected: "at least a batch id column".into(),
                    found: format!("shape {:?}", voxels.shape()),
                });
            }
            let out = voxels.to_owned();
            let perm = lexicographic_permutation(out.view());
            return Ok((out, perm));
        };

        let dim = geometry.dim();
        if voxels.ncols() != dim + 1 {
            return Err(CollateError::Shape {
                context: "split".into(),
                expected: format!("{} columns (batch id + {dim} coordinates)", dim + 1),
                found: format!("shape {:?}", voxels.shape()),
            });
        }

        let num_volumes = geometry.num_volumes() as f64;
        let mut out = voxels.to_owned();
        let mut bins = vec![0usize; dim];
        for mut row in out.rows_mut() {
            for axis in 0..dim {
                bins[axis] = geometry.bin_for(axis, row[axis + 1]);
            }
            let volume = geometry.volume_for_bins(&bins);
            row[0] = volume as f64 + row[0] * num_volumes;
            for axis in 0..dim {
                row[axis + 1] -= geometry.shift_for(axis, bins[axis]).trunc();
            }
        }

        let perm = lexicographic_permutation(out.view());
        Ok((out, perm))
    }
}

/// Stable lexicographic sort permutation over `(batch_id, coords..)` rows:
/// last coordinate column most significant, batch id column least.
fn lexicographic_permutation(voxels: ArrayView2<'_, f64>) -> Vec<usize> {
    let columns = voxels.ncols();
    let mut perm: Vec<usize> = (0..voxels.nrows()).collect();
    perm.sort_by(|&a, &b| {
        for column in (1..columns).rev() {
            match voxels[[a, column]].total_cmp(&voxels[[b, column]]) {
                Ordering::Equal => {}
                order => return order,
            }
        }
        voxels[[a, 0]].total_cmp(&voxels[[b, 0]])
    });
    perm
}

/// Reorder rows of a parallel tensor by the permutation returned from
/// [`VolumeSplitter::split`].
pub fn apply_permutation(rows: ArrayView2<'_, f64>, perm: &[usize]) -> Array2<f64> {
    rows.select(Axis(0), perm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn splitter(boundaries: crate::types::BoundarySpec) -> VolumeSplitter {
        VolumeSplitter::new(VolumeGeometry::new(boundaries).expect("geometry"))
    }

    #[test]
    fn translate_rejects_out_of_range_volume() {
        let splitter = splitter(vec![Some(vec![10.0]), None]);
        let coords = array![[1.0, 2.0]].into_dyn();
        let err = splitter.translate(coords.view(), 2).unwrap_err();
        assert!(matches!(
            err,
            CollateError::Range {
                volume: 2,
                num_volumes: 2
            }
        ));
    }

    #[test]
    fn translate_rejects_trailing_axis_mismatch() {
        let splitter = splitter(vec![Some(vec![10.0]), None]);
        let coords = array![[1.0, 2.0, 3.0]].into_dyn();
        let err = splitter.translate(coords.view(), 1).unwrap_err();
        assert!(matches!(err, CollateError::Shape { .. }));
    }

    #[test]
    fn translate_accepts_single_coordinate() {
        let splitter = splitter(vec![Some(vec![10.0]), None]);
        let coord = array![2.0, 5.0].into_dyn();
        let moved = splitter.translate(coord.view(), 1).expect("translate");
        assert_eq!(moved, array![12.0, 5.0].into_dyn());
    }

    #[test]
    fn fractional_cuts_shift_in_whole_voxel_units() {
        let splitter = splitter(vec![Some(vec![1376.3])]);
        let coords = array![[2.0]].into_dyn();
        let moved = splitter.translate(coords.view(), 1).expect("translate");
        assert_eq!(moved, array![[1378.0]].into_dyn());
    }

    #[test]
    fn split_rejects_wrong_column_count() {
        let splitter = splitter(vec![Some(vec![10.0]), None]);
        let voxels = array![[0.0, 5.0]];
        let err = splitter.split(voxels.view()).unwrap_err();
        assert!(matches!(err, CollateError::Shape { .. }));
    }

    #[test]
    fn split_orders_by_trailing_coordinate_then_batch_id() {
        let splitter = splitter(vec![None, None]);
        let voxels = array![
            [1.0, 0.0, 5.0],
            [0.0, 9.0, 1.0],
            [0.0, 0.0, 5.0],
            [1.0, 2.0, 1.0],
        ];
        let (out, perm) = splitter.split(voxels.view()).expect("split");
        let sorted = apply_permutation(out.view(), &perm);
        // Last coordinate is the most significant key, batch id the least.
        assert_eq!(
            sorted,
            array![
                [1.0, 2.0, 1.0],
                [0.0, 9.0, 1.0],
                [0.0, 0.0, 5.0],
                [1.0, 0.0, 5.0],
            ]
        );
    }

    #[test]
    fn passthrough_split_keeps_coordinates_and_batch_ids() {
        let splitter = VolumeSplitter::passthrough();
        let voxels = array![[1.0, 7.0, 3.0], [0.0, 2.0, 8.0]];
        let (out, perm) = splitter.split(voxels.view()).expect("split");
        assert_eq!(out, voxels);
        assert_eq!(perm, vec![0, 1]);
    }
}
