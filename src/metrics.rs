//! Occupancy metrics for collated sparse tensors.

use std::collections::HashMap;

use ndarray::ArrayView2;

use crate::types::{EventId, VirtualBatchId, VolumeId};

/// Aggregate skew metrics for per-volume voxel counts in one batch.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeOccupancy {
    /// Total voxels in the batch.
    pub total: usize,
    /// Number of occupied virtual batch ids.
    pub occupied: usize,
    /// Smallest per-id voxel count.
    pub min: usize,
    /// Largest per-id voxel count.
    pub max: usize,
    /// Mean voxels per occupied id.
    pub mean: f64,
    /// Largest share of the batch held by one id.
    pub max_share: f64,
    /// `max / min` (infinite when some occupied id would divide by zero).
    pub ratio: f64,
    /// Per-id breakdown, largest count first.
    pub per_volume: Vec<VolumeShare>,
}

/// Per-virtual-batch-id share of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeShare {
    /// Virtual batch id.
    pub id: VirtualBatchId,
    /// Originating event, `id / num_volumes`.
    pub event: EventId,
    /// Sub-volume within the event, `id % num_volumes`.
    pub volume: VolumeId,
    /// Voxel count under this id.
    pub count: usize,
    /// Fraction of the batch under this id.
    pub share: f64,
}

/// Compute occupancy metrics from a collated sparse tensor whose first
/// column holds virtual batch ids. Returns `None` for an empty tensor.
pub fn volume_occupancy(voxels: ArrayView2<'_, f64>, num_volumes: usize) -> Option<VolumeOccupancy> {
    if voxels.nrows() == 0 || num_volumes == 0 {
        return None;
    }
    let mut counts: HashMap<VirtualBatchId, usize> = HashMap::new();
    for row in voxels.rows() {
        *counts.entry(row[0] as VirtualBatchId).or_default() += 1;
    }

    let total: usize = counts.values().sum();
    let occupied = counts.len();
    let min = *counts.values().min()?;
    let max = *counts.values().max()?;
    let mean = total as f64 / occupied as f64;
    let max_share = max as f64 / total as f64;
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut per_volume: Vec<VolumeShare> = counts
        .iter()
        .map(|(&id, &count)| VolumeShare {
            id,
            event: id / num_volumes,
            volume: id % num_volumes,
            count,
            share: count as f64 / total as f64,
        })
        .collect();
    per_volume.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));
    Some(VolumeOccupancy {
        total,
        occupied,
        min,
        max,
        mean,
        max_share,
        ratio,
        per_volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn occupancy_decomposes_virtual_ids() {
        // Two volumes: ids 0/1 belong to event 0, id 3 to event 1 volume 1.
        let voxels = array![[0.0, 5.0], [1.0, 6.0], [1.0, 7.0], [3.0, 8.0]];
        let occupancy = volume_occupancy(voxels.view(), 2).expect("occupancy");
        assert_eq!(occupancy.total, 4);
        assert_eq!(occupancy.occupied, 3);
        assert_eq!(occupancy.min, 1);
        assert_eq!(occupancy.max, 2);
        assert_eq!(occupancy.per_volume[0].id, 1);
        assert_eq!(occupancy.per_volume[0].count, 2);
        let last = occupancy
            .per_volume
            .iter()
            .find(|share| share.id == 3)
            .expect("id 3");
        assert_eq!(last.event, 1);
        assert_eq!(last.volume, 1);
    }

    #[test]
    fn occupancy_is_none_for_empty_batch() {
        let voxels = ndarray::Array2::<f64>::zeros((0, 3));
        assert!(volume_occupancy(voxels.view(), 2).is_none());
    }
}
