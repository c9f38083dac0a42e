//! Fixed-size voxel clusters: a dense grid of catalog indices plus the
//! lifecycle state machine driving the streaming pipeline.

use crate::mesh::geometry::ClusterGeometry;
use crate::utils::math::Aabb;
use crate::world::block::Block;
use crate::world::catalog::BlockCatalog;
use crate::world::cluster_pos::ClusterPos;
use crossbeam_channel::Sender;
use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Lifecycle of a cluster.
///
/// Forward order is `Raw -> Generated -> GeometryPending -> GeometryCreated
/// -> GeometryBound`; `dirty_geo` resets any post-`Raw` state to `Generated`.
/// `GeometryPending` doubles as the build-dispatch dedup guard: a build is
/// never (re)dispatched while one is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    /// Created, block data not yet populated.
    Raw,
    /// Block data present (terrain fill or deserialization), no geometry.
    Generated,
    /// A mesh build has been dispatched and has not completed.
    GeometryPending,
    /// Mesh buffers exist but have not been handed to the renderer.
    GeometryCreated,
    /// Geometry handed to the rendering collaborator.
    GeometryBound,
}

struct StatusState {
    status: ClusterStatus,
    need_binding: bool,
}

/// One cluster of the voxel world.
///
/// Status/`need_binding` and the geometry slot are guarded by two independent
/// locks so a status reader never blocks on a geometry swap; the two locks
/// are never held at the same time. The block array is lazily allocated on
/// the first write, so an untouched cluster costs a few pointers.
pub struct Cluster {
    origin: ClusterPos,
    hv_size: u32,
    d_size: u32,
    catalog: Arc<BlockCatalog>,
    blocks: RwLock<Option<Vec<u16>>>,
    state: Mutex<StatusState>,
    geometry: Mutex<Option<ClusterGeometry>>,
    geo_refresh: Option<Sender<ClusterPos>>,
}

impl Cluster {
    pub fn new(
        origin: ClusterPos,
        hv_size: u32,
        d_size: u32,
        catalog: Arc<BlockCatalog>,
        geo_refresh: Option<Sender<ClusterPos>>,
    ) -> Self {
        Self {
            origin,
            hv_size,
            d_size,
            catalog,
            blocks: RwLock::new(None),
            state: Mutex::new(StatusState {
                status: ClusterStatus::Raw,
                need_binding: false,
            }),
            geometry: Mutex::new(None),
            geo_refresh,
        }
    }

    pub fn origin(&self) -> ClusterPos {
        self.origin
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

    pub fn bounds(&self) -> Aabb {
        let min = Vec3::new(self.origin.h as f32, 0.0, self.origin.v as f32);
        let size = Vec3::new(
            self.hv_size as f32,
            self.d_size as f32,
            self.hv_size as f32,
        );
        Aabb::new(min, min + size)
    }

    /// Flat index for local coordinates. Out-of-range access is a caller
    /// contract violation.
    fn flat_index(&self, h: u32, v: u32, d: u32) -> usize {
        assert!(
            h < self.hv_size && v < self.hv_size && d < self.d_size,
            "block coordinate ({h}, {v}, {d}) outside cluster of size {}x{}x{}",
            self.hv_size,
            self.hv_size,
            self.d_size
        );
        (d * self.hv_size * self.hv_size + v * self.hv_size + h) as usize
    }

    /// Catalog index at local coordinates; 0 (empty) before first write.
    pub fn block_index_relative(&self, h: u32, v: u32, d: u32) -> u16 {
        let index = self.flat_index(h, v, d);
        self.blocks
            .read()
            .as_ref()
            .map_or(0, |blocks| blocks[index])
    }

    /// Block value at local coordinates, resolved through the catalog.
    pub fn get_block_relative(&self, h: u32, v: u32, d: u32) -> Block {
        self.catalog.get(self.block_index_relative(h, v, d))
    }

    /// Registers `block` and stores its index, invalidating any existing
    /// geometry for this cluster. Callers editing through the world map also
    /// get boundary neighbors dirtied; editing a bare cluster only dirties
    /// the cluster itself.
    pub fn set_block_relative(&self, h: u32, v: u32, d: u32, block: Block) {
        let index = self.flat_index(h, v, d);
        let value = self.catalog.add(block);
        {
            let mut blocks = self.blocks.write();
            let blocks = blocks.get_or_insert_with(|| {
                vec![0u16; (self.hv_size * self.hv_size * self.d_size) as usize]
            });
            blocks[index] = value;
        }
        self.dirty_geo();
    }

    /// Raw index write used by terrain fills and deserialization; does not
    /// touch status.
    pub fn store_index_relative(&self, h: u32, v: u32, d: u32, value: u16) {
        let index = self.flat_index(h, v, d);
        let mut blocks = self.blocks.write();
        let blocks = blocks
            .get_or_insert_with(|| vec![0u16; (self.hv_size * self.hv_size * self.d_size) as usize]);
        blocks[index] = value;
    }

    /// Copy of the raw index array; all zeros if never written.
    pub fn snapshot_indices(&self) -> Vec<u16> {
        self.blocks.read().as_ref().cloned().unwrap_or_else(|| {
            vec![0u16; (self.hv_size * self.hv_size * self.d_size) as usize]
        })
    }

    pub fn status(&self) -> ClusterStatus {
        self.state.lock().status
    }

    pub fn need_binding(&self) -> bool {
        self.state.lock().need_binding
    }

    /// `Raw -> Generated`: block data has been populated.
    pub fn finalize_generation(&self) {
        let mut state = self.state.lock();
        if state.status == ClusterStatus::Raw {
            state.status = ClusterStatus::Generated;
        }
    }

    /// `Generated -> GeometryPending`. Returns false (and changes nothing)
    /// from any other state, which is what keeps duplicate build dispatches
    /// out of the worker pool.
    pub fn start_geo(&self) -> bool {
        let mut state = self.state.lock();
        if state.status == ClusterStatus::Generated {
            state.status = ClusterStatus::GeometryPending;
            true
        } else {
            false
        }
    }

    /// Stores a completed build and advances to `GeometryCreated`. A racing
    /// second completion is accepted last-write-wins.
    pub fn update_geo(&self, geometry: ClusterGeometry) {
        *self.geometry.lock() = Some(geometry);
        let mut state = self.state.lock();
        if matches!(
            state.status,
            ClusterStatus::Generated | ClusterStatus::GeometryPending
        ) {
            state.status = ClusterStatus::GeometryCreated;
        }
    }

    /// Flags the cluster for binding and raises the geo-refresh notification
    /// exactly once per dirty period; idempotent while already pending.
    pub fn request_binding(&self) {
        let mut state = self.state.lock();
        if !state.need_binding {
            state.need_binding = true;
            drop(state);
            if let Some(sender) = &self.geo_refresh {
                let _ = sender.send(self.origin);
            }
        }
    }

    /// `GeometryCreated -> GeometryBound`; clears the binding flag.
    pub fn finalize_bind(&self) {
        let mut state = self.state.lock();
        if state.status == ClusterStatus::GeometryCreated {
            state.status = ClusterStatus::GeometryBound;
        }
        state.need_binding = false;
    }

    /// Drops any geometry and returns to `Generated` so the streaming layer
    /// rebuilds; used when block data changes after geometry existed. A
    /// still-`Raw` cluster stays `Raw` (there is no data to rebuild from).
    pub fn dirty_geo(&self) {
        {
            let mut state = self.state.lock();
            if state.status != ClusterStatus::Raw {
                state.status = ClusterStatus::Generated;
            }
            state.need_binding = false;
        }
        *self.geometry.lock() = None;
    }

    pub fn geo_valid(&self) -> bool {
        self.geometry.lock().is_some()
    }

    /// Transfers the geometry out for binding; the cluster drops its
    /// reference so buffers are never uploaded twice.
    pub fn take_geometry(&self) -> Option<ClusterGeometry> {
        self.geometry.lock().take()
    }

    /// Clones the current geometry, mainly for persistence.
    pub fn geometry_snapshot(&self) -> Option<ClusterGeometry> {
        self.geometry.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::BlockShape;

    fn test_cluster() -> Cluster {
        Cluster::new(
            ClusterPos::new(0, 0),
            8,
            8,
            Arc::new(BlockCatalog::new()),
            None,
        )
    }

    #[test]
    fn blocks_default_to_empty() {
        let cluster = test_cluster();
        assert_eq!(cluster.get_block_relative(3, 4, 5), Block::EMPTY);
    }

    #[test]
    fn set_then_get_round_trips() {
        let cluster = test_cluster();
        let stone = Block::new(1, BlockShape::Solid);
        cluster.set_block_relative(1, 2, 3, stone);
        assert_eq!(cluster.get_block_relative(1, 2, 3), stone);
        assert_eq!(cluster.get_block_relative(3, 2, 1), Block::EMPTY);
    }

    #[test]
    #[should_panic(expected = "outside cluster")]
    fn out_of_range_access_is_fatal() {
        test_cluster().get_block_relative(8, 0, 0);
    }

    #[test]
    fn full_lifecycle_ends_bound() {
        let cluster = test_cluster();
        assert_eq!(cluster.status(), ClusterStatus::Raw);

        cluster.finalize_generation();
        assert_eq!(cluster.status(), ClusterStatus::Generated);

        assert!(cluster.start_geo());
        assert!(!cluster.start_geo()); // pending guard
        cluster.update_geo(ClusterGeometry::empty(cluster.bounds()));
        assert_eq!(cluster.status(), ClusterStatus::GeometryCreated);

        cluster.request_binding();
        assert!(cluster.need_binding());
        cluster.finalize_bind();
        assert_eq!(cluster.status(), ClusterStatus::GeometryBound);
        assert!(!cluster.need_binding());

        cluster.dirty_geo();
        assert_eq!(cluster.status(), ClusterStatus::Generated);
        assert!(!cluster.geo_valid());
    }

    #[test]
    fn set_block_invalidates_geometry() {
        let cluster = test_cluster();
        cluster.finalize_generation();
        cluster.update_geo(ClusterGeometry::empty(cluster.bounds()));
        assert!(cluster.geo_valid());

        cluster.set_block_relative(0, 0, 0, Block::new(1, BlockShape::Solid));
        assert!(!cluster.geo_valid());
        assert_eq!(cluster.status(), ClusterStatus::Generated);
    }

    #[test]
    fn refresh_event_fires_once_per_dirty_period() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cluster = Cluster::new(
            ClusterPos::new(32, 0),
            8,
            8,
            Arc::new(BlockCatalog::new()),
            Some(tx),
        );
        cluster.finalize_generation();
        cluster.update_geo(ClusterGeometry::empty(cluster.bounds()));

        cluster.request_binding();
        cluster.request_binding();
        cluster.request_binding();
        assert_eq!(rx.try_iter().count(), 1);

        cluster.dirty_geo();
        cluster.request_binding();
        assert_eq!(rx.try_iter().count(), 1);
    }
}
