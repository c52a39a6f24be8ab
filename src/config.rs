use serde::{Deserialize, Serialize};

use crate::types::BoundarySpec;

/// Collation configuration handed over by the external config loader.
///
/// Immutable once constructed; assemblers take it by value. The on-disk
/// shape mirrors the pipeline configuration, e.g.
/// `{"boundaries": [[1376.3], null, null]}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CollateConfig {
    /// Per-axis volume boundaries. Each entry is either a non-empty list of
    /// cut positions (in voxel units) or `null` for no boundary along that
    /// axis. Absent entirely, splitting is disabled and the whole detector
    /// is treated as a single implicit volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<BoundarySpec>,
}

impl CollateConfig {
    /// Config with splitting disabled.
    pub fn single_volume() -> Self {
        Self { boundaries: None }
    }

    /// Config splitting the detector at the given per-axis cuts.
    pub fn with_boundaries(boundaries: BoundarySpec) -> Self {
        Self {
            boundaries: Some(boundaries),
        }
    }
}
