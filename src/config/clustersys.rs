//! Cluster system tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which culling table the mesh builder uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullingMode {
    /// Only full solids occlude; cheap, overdraws around ramps.
    Binary,
    /// Profile comparison on the shared boundary; seals matching ramp seams.
    Directional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSysConfig {
    /// Horizontal cluster edge length, in blocks.
    pub hv_size: u32,
    /// World slab depth, in blocks. The world is one cluster deep.
    pub d_size: u32,
    /// Rings probed around the focus each tick.
    pub ring_radius: u32,
    /// Extra rings a cluster may drift beyond the scan before eviction.
    pub evict_margin: u32,
    /// Maximum geometry bindings per tick.
    pub load_limit: usize,
    /// Optional minimum spacing between consecutive binds.
    pub min_bind_interval_ms: Option<u64>,
    /// Mesh worker threads; 0 lets the pool size itself to the machine.
    pub mesh_threads: usize,
    pub culling: CullingMode,
}

impl ClusterSysConfig {
    pub fn min_bind_interval(&self) -> Option<Duration> {
        self.min_bind_interval_ms.map(Duration::from_millis)
    }

    pub fn blocks_per_cluster(&self) -> usize {
        (self.hv_size * self.hv_size * self.d_size) as usize
    }
}

impl Default for ClusterSysConfig {
    fn default() -> Self {
        Self {
            hv_size: 32,
            d_size: 32,
            ring_radius: 8,
            evict_margin: 2,
            load_limit: 3,
            min_bind_interval_ms: None,
            mesh_threads: 0,
            culling: CullingMode::Directional,
        }
    }
}
