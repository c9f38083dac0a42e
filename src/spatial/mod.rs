//! Spatial indexing over bounded objects.

pub mod octree;

pub use octree::{HasBounds, Octree, DEFAULT_MAX_DEPTH, DEFAULT_MAX_OBJECTS};

use crate::utils::math::Aabb;
use crate::world::cluster_pos::ClusterPos;

/// Lightweight octree entry standing in for a loaded cluster; visibility
/// passes query these and fetch the cluster from the world map by origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterHandle {
    pub origin: ClusterPos,
    pub bounds: Aabb,
}

impl HasBounds for ClusterHandle {
    fn bounds(&self) -> Aabb {
        self.bounds
    }
}
