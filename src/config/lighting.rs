//! Lighting tuning. A single point light (the sun, effectively) drives the
//! per-vertex shadow term.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// World-space light position the shadow rays aim at.
    pub light_pos: Vec3,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            light_pos: Vec3::new(800.0, 2000.0, 600.0),
        }
    }
}
