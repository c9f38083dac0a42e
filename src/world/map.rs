//! The loaded world: a map from cluster origin to cluster, plus the global
//! block queries that cross cluster boundaries (lookup, edit, drop height,
//! segment occlusion).

use crate::config::EngineConfig;
use crate::mesh::builder::NeighborClusters;
use crate::mesh::lighting::LightOcclusion;
use crate::world::block::Block;
use crate::world::block_def::BlockDefRegistry;
use crate::world::catalog::BlockCatalog;
use crate::world::cluster::Cluster;
use crate::world::cluster_pos::ClusterPos;
use crate::world::events::WorldEvents;
use crossbeam_channel::Sender;
use glam::Vec3;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Step length of the occlusion march, in blocks.
const OCCLUSION_STEP: f32 = 0.5;
/// Cap on march samples so a segment toward a distant light stays bounded.
const OCCLUSION_MAX_SAMPLES: usize = 256;

/// All currently loaded clusters, keyed by origin.
///
/// The map itself is guarded by one `RwLock`; cluster contents have their own
/// interior locks, so holders of an `Arc<Cluster>` never contend with map
/// insertions.
pub struct WorldMap {
    clusters: RwLock<HashMap<ClusterPos, Arc<Cluster>>>,
    catalog: Arc<BlockCatalog>,
    geo_refresh: Option<Sender<ClusterPos>>,
    hv_size: u32,
    d_size: u32,
}

impl WorldMap {
    pub fn new(
        hv_size: u32,
        d_size: u32,
        catalog: Arc<BlockCatalog>,
        geo_refresh: Option<Sender<ClusterPos>>,
    ) -> Self {
        Self {
            clusters: RwLock::new(HashMap::new()),
            catalog,
            geo_refresh,
            hv_size,
            d_size,
        }
    }

    pub fn hv_size(&self) -> u32 {
        self.hv_size
    }

    pub fn d_size(&self) -> u32 {
        self.d_size
    }

    pub fn catalog(&self) -> &Arc<BlockCatalog> {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.clusters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.read().is_empty()
    }

    pub fn get_cluster(&self, pos: ClusterPos) -> Option<Arc<Cluster>> {
        self.clusters.read().get(&pos).cloned()
    }

    pub fn contains(&self, pos: ClusterPos) -> bool {
        self.clusters.read().contains_key(&pos)
    }

    /// The cluster at `pos`, created `Raw` if absent.
    pub fn ensure_cluster(&self, pos: ClusterPos) -> Arc<Cluster> {
        if let Some(cluster) = self.get_cluster(pos) {
            return cluster;
        }
        let mut clusters = self.clusters.write();
        clusters
            .entry(pos)
            .or_insert_with(|| {
                Arc::new(Cluster::new(
                    pos,
                    self.hv_size,
                    self.d_size,
                    self.catalog.clone(),
                    self.geo_refresh.clone(),
                ))
            })
            .clone()
    }

    /// Inserts a pre-built cluster (deserialization path), replacing any
    /// cluster already at its origin.
    pub fn insert_cluster(&self, cluster: Arc<Cluster>) {
        self.clusters.write().insert(cluster.origin(), cluster);
    }

    pub fn remove_cluster(&self, pos: ClusterPos) -> Option<Arc<Cluster>> {
        self.clusters.write().remove(&pos)
    }

    pub fn cluster_positions(&self) -> Vec<ClusterPos> {
        self.clusters.read().keys().copied().collect()
    }

    /// Snapshot of the 4 horizontal neighbors around `pos` for a mesh build.
    pub fn neighbors_of(&self, pos: ClusterPos) -> NeighborClusters {
        let [north, south, east, west] = pos.neighbors(self.hv_size);
        NeighborClusters {
            north: self.get_cluster(north),
            south: self.get_cluster(south),
            east: self.get_cluster(east),
            west: self.get_cluster(west),
        }
    }

    /// Block at a global coordinate. Above or below the world slab is empty
    /// sky / empty underside; a horizontal position with no loaded cluster
    /// resolves to the invalid boundary sentinel.
    pub fn block_at(&self, h: i32, v: i32, d: i32) -> Block {
        if d < 0 || d >= self.d_size as i32 {
            return Block::EMPTY;
        }
        let pos = ClusterPos::containing(h, v, self.hv_size);
        match self.get_cluster(pos) {
            Some(cluster) => cluster.get_block_relative(
                (h - pos.h) as u32,
                (v - pos.v) as u32,
                d as u32,
            ),
            None => Block::INVALID,
        }
    }

    /// Writes a block at a global coordinate, creating the cluster if
    /// needed. Loaded neighbors sharing the edited boundary column are
    /// dirtied as well, since their culled faces may now be wrong.
    pub fn set_block(&self, h: i32, v: i32, d: i32, block: Block) {
        assert!(
            d >= 0 && d < self.d_size as i32,
            "block depth {d} outside world slab of depth {}",
            self.d_size
        );
        let pos = ClusterPos::containing(h, v, self.hv_size);
        let cluster = self.ensure_cluster(pos);
        let (lh, lv) = ((h - pos.h) as u32, (v - pos.v) as u32);
        cluster.set_block_relative(lh, lv, d as u32, block);

        let [north, south, east, west] = pos.neighbors(self.hv_size);
        let mut touched = Vec::with_capacity(2);
        if lv == 0 {
            touched.push(north);
        }
        if lv == self.hv_size - 1 {
            touched.push(south);
        }
        if lh == self.hv_size - 1 {
            touched.push(east);
        }
        if lh == 0 {
            touched.push(west);
        }
        for neighbor in touched {
            if let Some(cluster) = self.get_cluster(neighbor) {
                cluster.dirty_geo();
            }
        }
    }

    /// Height of the topmost surface under a horizontal position: the top of
    /// the highest block column that occupies that point, or `None` over an
    /// unloaded or fully vacant column. Fluid does not carry weight.
    pub fn drop_height(&self, h: f32, v: f32) -> Option<f32> {
        let (hi, vi) = (h.floor() as i32, v.floor() as i32);
        let (fh, fv) = (h - h.floor(), v - v.floor());

        for d in (0..self.d_size as i32).rev() {
            let block = self.block_at(hi, vi, d);
            if block.shape.is_invalid() {
                return None;
            }
            let profile = block.shape.profile();
            if block.shape.is_empty() || block.shape.is_fluid() || profile.is_vacant() {
                continue;
            }
            return Some(d as f32 + profile.height_at(fh, fv));
        }
        None
    }
}

impl LightOcclusion for WorldMap {
    /// Marches the segment in fixed steps, testing each sample against the
    /// occupied column of its cell. Half-block steps can tunnel past a thin
    /// corner of a ramp; shadow edges tolerate that.
    fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return false;
        }
        let steps = ((length / OCCLUSION_STEP).ceil() as usize).min(OCCLUSION_MAX_SAMPLES);
        let dir = delta / length;

        for i in 1..=steps {
            let p = from + dir * (OCCLUSION_STEP * i as f32).min(length);
            let (hi, vi, di) = (
                p.x.floor() as i32,
                p.z.floor() as i32,
                p.y.floor() as i32,
            );
            if di < 0 || di >= self.d_size as i32 {
                continue;
            }
            let block = self.block_at(hi, vi, di);
            if block
                .shape
                .occupies(p.x - p.x.floor(), p.z - p.z.floor(), p.y - p.y.floor())
            {
                return true;
            }
        }
        false
    }
}

/// Top-level handle tying the registries, the cluster map and the event
/// channels together. Everything is behind `Arc` so the streaming controller
/// and worker pool share it freely.
pub struct World {
    pub config: EngineConfig,
    pub catalog: Arc<BlockCatalog>,
    pub defs: Arc<BlockDefRegistry>,
    pub map: Arc<WorldMap>,
    pub events: Arc<WorldEvents>,
}

impl World {
    pub fn new(config: EngineConfig) -> Self {
        let catalog = Arc::new(BlockCatalog::new());
        let defs = Arc::new(BlockDefRegistry::new());
        let events = Arc::new(WorldEvents::new());
        let map = Arc::new(WorldMap::new(
            config.cluster.hv_size,
            config.cluster.d_size,
            catalog.clone(),
            Some(events.geo_refresh_sender()),
        ));
        Self {
            config,
            catalog,
            defs,
            map,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::BlockShape;
    use crate::world::cluster::ClusterStatus;

    fn test_map() -> WorldMap {
        WorldMap::new(8, 8, Arc::new(BlockCatalog::new()), None)
    }

    #[test]
    fn ensure_cluster_is_idempotent() {
        let map = test_map();
        let a = map.ensure_cluster(ClusterPos::new(0, 0));
        let b = map.ensure_cluster(ClusterPos::new(0, 0));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn global_lookup_crosses_cluster_boundaries() {
        let map = test_map();
        let stone = Block::new(1, BlockShape::Solid);
        map.set_block(-1, 10, 3, stone);
        assert_eq!(map.block_at(-1, 10, 3), stone);
        // Same column, different cluster than (0, 8).
        assert_eq!(
            ClusterPos::containing(-1, 10, 8),
            ClusterPos::new(-8, 8)
        );
    }

    #[test]
    fn out_of_slab_depth_is_empty_sky() {
        let map = test_map();
        map.ensure_cluster(ClusterPos::new(0, 0));
        assert_eq!(map.block_at(1, 1, -1), Block::EMPTY);
        assert_eq!(map.block_at(1, 1, 8), Block::EMPTY);
    }

    #[test]
    fn unloaded_position_is_the_boundary_sentinel() {
        let map = test_map();
        assert_eq!(map.block_at(100, 100, 0), Block::INVALID);
    }

    #[test]
    fn boundary_edit_dirties_the_sharing_neighbor() {
        let map = test_map();
        let east = map.ensure_cluster(ClusterPos::new(8, 0));
        east.finalize_generation();
        east.update_geo(crate::mesh::geometry::ClusterGeometry::empty(east.bounds()));
        assert_eq!(east.status(), ClusterStatus::GeometryCreated);

        // Edit the column at h=7 in cluster (0,0): shares the east boundary.
        map.set_block(7, 3, 3, Block::new(1, BlockShape::Solid));
        assert_eq!(east.status(), ClusterStatus::Generated);
        assert!(!east.geo_valid());
    }

    #[test]
    fn interior_edit_leaves_neighbors_alone() {
        let map = test_map();
        let east = map.ensure_cluster(ClusterPos::new(8, 0));
        east.finalize_generation();
        east.update_geo(crate::mesh::geometry::ClusterGeometry::empty(east.bounds()));

        map.set_block(3, 3, 3, Block::new(1, BlockShape::Solid));
        assert_eq!(east.status(), ClusterStatus::GeometryCreated);
    }

    #[test]
    fn drop_height_tracks_ramp_surfaces() {
        let map = test_map();
        map.set_block(2, 2, 0, Block::new(1, BlockShape::Solid));
        map.set_block(2, 2, 1, Block::new(1, BlockShape::FullRamp(crate::world::block::RampDir::East)));

        // Mid-cell on an east-ascending ramp at d=1: surface at 1 + 0.5.
        let height = map.drop_height(2.5, 2.5).unwrap();
        assert!((height - 1.5).abs() < 1e-5);

        // A column with only the solid base.
        map.set_block(3, 2, 0, Block::new(1, BlockShape::Solid));
        assert!((map.drop_height(3.5, 2.5).unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn drop_height_ignores_fluid() {
        let map = test_map();
        map.set_block(1, 1, 0, Block::new(1, BlockShape::Solid));
        map.set_block(1, 1, 4, Block::new(2, BlockShape::Fluid));
        assert!((map.drop_height(1.5, 1.5).unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn drop_height_is_none_over_unloaded_space() {
        let map = test_map();
        assert!(map.drop_height(500.0, 500.0).is_none());
    }

    #[test]
    fn segment_occlusion_detects_a_wall() {
        let map = test_map();
        for d in 0..8 {
            map.set_block(4, 2, d, Block::new(1, BlockShape::Solid));
        }
        let from = Vec3::new(2.5, 4.5, 2.5);
        let to = Vec3::new(6.5, 4.5, 2.5);
        assert!(map.segment_blocked(from, to));
        // Parallel segment one row over passes clear (through loaded empty
        // space in the same cluster).
        map.ensure_cluster(ClusterPos::new(0, 0));
        let from = Vec3::new(2.5, 4.5, 4.5);
        let to = Vec3::new(6.5, 4.5, 4.5);
        assert!(!map.segment_blocked(from, to));
    }
}
