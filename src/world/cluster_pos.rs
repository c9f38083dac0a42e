//! Integer cluster origins. A cluster covers the world block columns
//! `[h, h + hv_size)` x `[v, v + hv_size)`; both components are always a
//! multiple of the horizontal size.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterPos {
    pub h: i32,
    pub v: i32,
}

impl ClusterPos {
    pub fn new(h: i32, v: i32) -> Self {
        Self { h, v }
    }

    /// Origin of the cluster containing a world block coordinate.
    pub fn containing(h: i32, v: i32, hv_size: u32) -> Self {
        let size = hv_size as i32;
        Self {
            h: h.div_euclid(size) * size,
            v: v.div_euclid(size) * size,
        }
    }

    /// Origin of the cluster containing a world-space point (x = h, z = v).
    pub fn containing_point(point: Vec3, hv_size: u32) -> Self {
        Self::containing(point.x.floor() as i32, point.z.floor() as i32, hv_size)
    }

    pub fn offset(&self, dh: i32, dv: i32, hv_size: u32) -> Self {
        let size = hv_size as i32;
        Self {
            h: self.h + dh * size,
            v: self.v + dv * size,
        }
    }

    /// The 4 horizontal neighbors in North, South, East, West order.
    pub fn neighbors(&self, hv_size: u32) -> [Self; 4] {
        [
            self.offset(0, -1, hv_size),
            self.offset(0, 1, hv_size),
            self.offset(1, 0, hv_size),
            self.offset(-1, 0, hv_size),
        ]
    }

    /// Chebyshev distance in whole clusters; the streaming footprint is a
    /// square, so this is the eviction metric.
    pub fn ring_distance(&self, other: &Self, hv_size: u32) -> i32 {
        let size = hv_size as i32;
        let dh = ((self.h - other.h) / size).abs();
        let dv = ((self.v - other.v) / size).abs();
        dh.max(dv)
    }

    /// Save-file name for the persistence collaborator.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(format!("cluster_{}_{}.bin", self.h, self.v))
    }
}

impl fmt::Display for ClusterPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.h, self.v)
    }
}
