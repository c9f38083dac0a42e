//! Background mesh builds on a dedicated rayon pool, results flowing back
//! over a crossbeam channel drained by the streaming controller each tick.

use crate::mesh::builder::{build_cluster_geometry, MeshContext, NeighborClusters};
use crate::mesh::culling::CullingStrategy;
use crate::mesh::geometry::ClusterGeometry;
use crate::mesh::lighting::LightOcclusion;
use crate::world::block_def::BlockDefRegistry;
use crate::world::catalog::BlockCatalog;
use crate::world::cluster::Cluster;
use crate::world::cluster_pos::ClusterPos;
use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;
use std::sync::Arc;

/// One dispatched build: the cluster plus a neighbor snapshot taken at
/// dispatch time.
pub struct BuildJob {
    pub pos: ClusterPos,
    pub cluster: Arc<Cluster>,
    pub neighbors: NeighborClusters,
}

pub struct BuildResult {
    pub pos: ClusterPos,
    pub geometry: ClusterGeometry,
}

pub struct MeshWorkerPool {
    pool: rayon::ThreadPool,
    results_tx: Sender<BuildResult>,
    results_rx: Receiver<BuildResult>,
    catalog: Arc<BlockCatalog>,
    defs: Arc<BlockDefRegistry>,
    culling: Arc<dyn CullingStrategy>,
    occlusion: Option<Arc<dyn LightOcclusion + Send + Sync>>,
    light_pos: Vec3,
}

impl MeshWorkerPool {
    pub fn new(
        threads: usize,
        catalog: Arc<BlockCatalog>,
        defs: Arc<BlockDefRegistry>,
        culling: Arc<dyn CullingStrategy>,
        occlusion: Option<Arc<dyn LightOcclusion + Send + Sync>>,
        light_pos: Vec3,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mesh-worker-{i}"))
            .build()
            .context("failed to build mesh worker pool")?;
        let (results_tx, results_rx) = unbounded();
        Ok(Self {
            pool,
            results_tx,
            results_rx,
            catalog,
            defs,
            culling,
            occlusion,
            light_pos,
        })
    }

    /// Queues a build; the result arrives on the completion channel.
    pub fn submit(&self, job: BuildJob) {
        let tx = self.results_tx.clone();
        let catalog = self.catalog.clone();
        let defs = self.defs.clone();
        let culling = self.culling.clone();
        let occlusion = self.occlusion.clone();
        let light_pos = self.light_pos;

        self.pool.spawn(move || {
            let ctx = MeshContext {
                catalog: &catalog,
                defs: &defs,
                culling: culling.as_ref(),
                light_pos,
                occlusion: occlusion.as_deref().map(|o| o as &dyn LightOcclusion),
            };
            let geometry = build_cluster_geometry(&job.cluster, &job.neighbors, &ctx);
            // The controller may be gone during shutdown; drop the result.
            let _ = tx.send(BuildResult {
                pos: job.pos,
                geometry,
            });
        });
    }

    pub fn completions(&self) -> &Receiver<BuildResult> {
        &self.results_rx
    }
}
