//! Assembles a full streaming engine from one config: world, worker pool,
//! limiter, controller and floating origin, wired together the way a host
//! application wants them.

use crate::config::{CullingMode, EngineConfig};
use crate::mesh::culling::{BinaryCulling, CullingStrategy, DirectionalCulling};
use crate::mesh::geometry::ClusterGeometry;
use crate::mesh::lighting::LightOcclusion;
use crate::stream::controller::StreamingController;
use crate::stream::limiter::LoadLimiter;
use crate::stream::origin::FloatingOrigin;
use crate::stream::workers::MeshWorkerPool;
use crate::world::cluster_pos::ClusterPos;
use crate::world::map::World;
use anyhow::Result;
use glam::Vec3;
use log::info;
use std::sync::Arc;

pub struct Engine {
    pub world: Arc<World>,
    pub controller: StreamingController,
    pub origin: Arc<FloatingOrigin>,
    pub limiter: Arc<LoadLimiter>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let world = Arc::new(World::new(config));
        let cluster_cfg = &world.config.cluster;

        let culling: Arc<dyn CullingStrategy> = match cluster_cfg.culling {
            CullingMode::Binary => Arc::new(BinaryCulling),
            CullingMode::Directional => Arc::new(DirectionalCulling),
        };
        let occlusion = world.map.clone() as Arc<dyn LightOcclusion + Send + Sync>;
        let workers = MeshWorkerPool::new(
            cluster_cfg.mesh_threads,
            world.catalog.clone(),
            world.defs.clone(),
            culling,
            Some(occlusion),
            world.config.lighting.light_pos,
        )?;
        let limiter = Arc::new(LoadLimiter::new(
            cluster_cfg.load_limit,
            cluster_cfg.min_bind_interval(),
        ));
        let controller = StreamingController::new(world.clone(), workers, limiter.clone());

        info!(
            "engine up: {}x{}x{} clusters, ring radius {}, {} binds/tick",
            cluster_cfg.hv_size,
            cluster_cfg.hv_size,
            cluster_cfg.d_size,
            cluster_cfg.ring_radius,
            cluster_cfg.load_limit
        );

        Ok(Self {
            world,
            controller,
            origin: Arc::new(FloatingOrigin::new()),
            limiter,
        })
    }

    /// One engine tick around `focus` (world space); returns the geometry
    /// handoffs the rendering collaborator should upload this tick.
    pub fn tick(&self, focus: Vec3) -> Vec<(ClusterPos, ClusterGeometry)> {
        self.controller.update(focus);
        self.controller.next_bindings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::{Block, BlockShape};
    use crate::world::block_def::BlockDef;
    use crate::world::cluster::ClusterStatus;
    use std::time::Duration;

    #[test]
    fn default_engine_streams_a_cluster_end_to_end() {
        let mut config = EngineConfig::default();
        config.cluster.hv_size = 8;
        config.cluster.d_size = 8;
        config.cluster.ring_radius = 1;
        let engine = Engine::new(config).unwrap();
        let stone = engine.world.defs.register(BlockDef::uniform("stone", 1));

        let mut bound = 0;
        for _ in 0..100 {
            bound += engine.tick(Vec3::ZERO).len();
            for pos in engine.world.events.need_cluster_events().try_iter() {
                let cluster = engine.world.map.ensure_cluster(pos);
                if cluster.status() == ClusterStatus::Raw {
                    cluster.set_block_relative(1, 1, 1, Block::new(stone, BlockShape::Solid));
                    cluster.finalize_generation();
                }
            }
            if bound == 9 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(bound, 9);
    }
}
