//! Spatial index tuning.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Objects a node holds before splitting.
    pub max_objects: usize,
    /// Hard recursion limit; coincident objects stop splitting here.
    pub max_depth: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            max_objects: 8,
            max_depth: 40,
        }
    }
}
