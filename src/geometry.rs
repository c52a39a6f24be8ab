//! Sub-volume enumeration and coordinate shift tables.
//!
//! A detector may consist of several independent sub-volumes (cryostats,
//! TPCs) stored together in one file. [`VolumeGeometry`] turns a per-axis
//! boundary specification into the full list of sub-volumes and, for each
//! axis and bin, the amount by which coordinates must be shifted to re-zero
//! them to volume-local space.

use std::ops::Range;

use crate::errors::CollateError;
use crate::types::{BoundarySpec, EventId, VirtualBatchId, VolumeId};

/// Immutable sub-volume geometry derived from axis boundary cuts.
///
/// Construction sorts each axis's cuts ascending and materializes two
/// tables that never change afterwards:
///
/// * the sub-volume enumeration — every combination of per-axis bins, in
///   row-major order with the last axis varying fastest; the position of a
///   combination in this list is its [`VolumeId`];
/// * the shift table — per axis, one entry per bin; bin 0 shifts by zero,
///   bin `k > 0` shifts by the `(k-1)`-th cut, and the final bin shares the
///   value of the last cut.
#[derive(Clone, Debug)]
pub struct VolumeGeometry {
    boundaries: BoundarySpec,
    bins: Vec<usize>,
    combos: Vec<Vec<usize>>,
    shifts: Vec<Vec<f64>>,
}

impl VolumeGeometry {
    /// Build a geometry from per-axis boundary definitions.
    ///
    /// Each entry must be either `None` (axis not split) or a non-empty
    /// list of cut positions; an empty list fails with
    /// [`CollateError::Configuration`]. Cuts need not arrive sorted.
    pub fn new(definitions: BoundarySpec) -> Result<Self, CollateError> {
        let mut boundaries = definitions;
        for (axis, cuts) in boundaries.iter_mut().enumerate() {
            if let Some(cuts) = cuts.as_mut() {
                if cuts.is_empty() {
                    return Err(CollateError::Configuration {
                        axis,
                        reason: "cut list must be non-empty (use null for no boundary)".into(),
                    });
                }
                if cuts.iter().any(|cut| !cut.is_finite()) {
                    return Err(CollateError::Configuration {
                        axis,
                        reason: "cut positions must be finite".into(),
                    });
                }
                cuts.sort_by(f64::total_cmp);
            }
        }

        let bins: Vec<usize> = boundaries
            .iter()
            .map(|cuts| cuts.as_ref().map_or(0, Vec::len) + 1)
            .collect();
        let combos = enumerate_bins(&bins);

        let shifts = boundaries
            .iter()
            .map(|cuts| match cuts {
                None => vec![0.0],
                Some(cuts) => {
                    let mut table = Vec::with_capacity(cuts.len() + 1);
                    table.push(0.0);
                    table.extend_from_slice(&cuts[..cuts.len() - 1]);
                    table.push(cuts[cuts.len() - 1]);
                    table
                }
            })
            .collect();

        Ok(Self {
            boundaries,
            bins,
            combos,
            shifts,
        })
    }

    /// Number of spatial axes.
    pub fn dim(&self) -> usize {
        self.boundaries.len()
    }

    /// Total number of sub-volumes: the product over axes of
    /// `len(cuts) + 1`, and 1 when no axis is split.
    pub fn num_volumes(&self) -> usize {
        self.combos.len()
    }

    /// Sorted cut positions along one axis, or `None` if the axis is whole.
    pub fn cuts(&self, axis: usize) -> Option<&[f64]> {
        self.boundaries[axis].as_deref()
    }

    /// Shift applied to coordinates in `bin` along `axis` to re-zero them
    /// to volume-local space.
    ///
    /// # Panics
    /// Panics if `axis` or `bin` is out of range.
    pub fn shift_for(&self, axis: usize, bin: usize) -> f64 {
        self.shifts[axis][bin]
    }

    /// Per-axis bin indices of one sub-volume.
    ///
    /// # Panics
    /// Panics if `volume` is out of range; callers with unchecked input go
    /// through [`VolumeSplitter`](crate::splitter::VolumeSplitter) which
    /// range-checks first.
    pub fn bins_for(&self, volume: VolumeId) -> &[usize] {
        &self.combos[volume]
    }

    /// Volume holding the given per-axis bins. Inverse of [`Self::bins_for`];
    /// follows the same mixed-radix order the enumeration was built in.
    pub(crate) fn volume_for_bins(&self, per_axis_bins: &[usize]) -> VolumeId {
        let mut volume = 0usize;
        for (axis, &bin) in per_axis_bins.iter().enumerate() {
            volume = volume * self.bins[axis] + bin;
        }
        debug_assert_eq!(self.combos[volume], per_axis_bins);
        volume
    }

    /// Bin along `axis` that holds `coordinate`: the index of the first cut
    /// the coordinate falls below, or the last bin once it reaches the
    /// final cut. Axes without boundaries put everything in bin 0.
    pub(crate) fn bin_for(&self, axis: usize, coordinate: f64) -> usize {
        match &self.boundaries[axis] {
            None => 0,
            Some(cuts) => cuts
                .iter()
                .position(|cut| coordinate < *cut)
                .unwrap_or(cuts.len()),
        }
    }

    /// Virtual batch ids owned by one event: the contiguous range
    /// `[event * num_volumes, (event + 1) * num_volumes)`. Disjoint across
    /// distinct events.
    pub fn virtual_batch_ids(&self, event: EventId) -> Range<VirtualBatchId> {
        let start = event * self.num_volumes();
        start..start + self.num_volumes()
    }
}

/// Explicit Cartesian product over per-axis bin counts, row-major with the
/// last axis varying fastest.
fn enumerate_bins(bins: &[usize]) -> Vec<Vec<usize>> {
    let total: usize = bins.iter().product();
    let mut combos = Vec::with_capacity(total);
    let mut current = vec![0usize; bins.len()];
    for _ in 0..total {
        combos.push(current.clone());
        for axis in (0..bins.len()).rev() {
            current[axis] += 1;
            if current[axis] < bins[axis] {
                break;
            }
            current[axis] = 0;
        }
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cut_list_is_rejected() {
        let err = VolumeGeometry::new(vec![Some(vec![]), None]).unwrap_err();
        assert!(matches!(err, CollateError::Configuration { axis: 0, .. }));
    }

    #[test]
    fn cuts_are_sorted_ascending() {
        let geometry = VolumeGeometry::new(vec![Some(vec![20.0, 5.0, 10.0])]).expect("geometry");
        assert_eq!(geometry.cuts(0), Some(&[5.0, 10.0, 20.0][..]));
    }

    #[test]
    fn num_volumes_is_product_of_bins() {
        let geometry =
            VolumeGeometry::new(vec![Some(vec![1.0, 2.0]), None, Some(vec![7.5])]).expect("geometry");
        assert_eq!(geometry.num_volumes(), 3 * 1 * 2);

        let whole = VolumeGeometry::new(vec![None, None, None]).expect("geometry");
        assert_eq!(whole.num_volumes(), 1);
    }

    #[test]
    fn shift_table_matches_cut_layout() {
        let geometry = VolumeGeometry::new(vec![Some(vec![10.0, 30.0])]).expect("geometry");
        // Three bins: below 10, [10, 30), and at or above 30.
        assert_eq!(geometry.shift_for(0, 0), 0.0);
        assert_eq!(geometry.shift_for(0, 1), 10.0);
        assert_eq!(geometry.shift_for(0, 2), 30.0);
    }

    #[test]
    fn enumeration_is_stable_and_invertible() {
        let geometry =
            VolumeGeometry::new(vec![Some(vec![1.0]), Some(vec![2.0, 3.0])]).expect("geometry");
        assert_eq!(geometry.num_volumes(), 6);
        for volume in 0..geometry.num_volumes() {
            let bins = geometry.bins_for(volume).to_vec();
            assert_eq!(geometry.volume_for_bins(&bins), volume);
        }
        // Last axis varies fastest.
        assert_eq!(geometry.bins_for(0), &[0, 0]);
        assert_eq!(geometry.bins_for(1), &[0, 1]);
        assert_eq!(geometry.bins_for(3), &[1, 0]);
    }

    #[test]
    fn virtual_batch_ids_are_contiguous_and_disjoint() {
        let geometry = VolumeGeometry::new(vec![Some(vec![10.0]), None]).expect("geometry");
        assert_eq!(geometry.virtual_batch_ids(0), 0..2);
        assert_eq!(geometry.virtual_batch_ids(1), 2..4);
        assert_eq!(geometry.virtual_batch_ids(5), 10..12);
    }

    #[test]
    fn bin_for_uses_half_open_intervals() {
        let geometry = VolumeGeometry::new(vec![Some(vec![10.0, 30.0])]).expect("geometry");
        assert_eq!(geometry.bin_for(0, 9.99), 0);
        assert_eq!(geometry.bin_for(0, 10.0), 1);
        assert_eq!(geometry.bin_for(0, 29.0), 1);
        assert_eq!(geometry.bin_for(0, 30.0), 2);
        assert_eq!(geometry.bin_for(0, 1e9), 2);
    }
}
