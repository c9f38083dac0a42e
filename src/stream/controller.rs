//! The streaming controller: one `update` per tick walks a square ring of
//! probe positions around the focus, requests missing clusters, dispatches
//! mesh builds, accepts completions and queues bind handoffs, throttled by
//! the load limiter.

use crate::mesh::geometry::ClusterGeometry;
use crate::spatial::{ClusterHandle, Octree};
use crate::stream::limiter::LoadLimiter;
use crate::stream::workers::{BuildJob, MeshWorkerPool};
use crate::utils::math::ViewFrustum;
use crate::world::cluster::ClusterStatus;
use crate::world::cluster_pos::ClusterPos;
use crate::world::map::World;
use glam::Vec3;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Probe offsets sampled on each ring, scaled by the ring number. 8 probes
/// per ring (edge midpoints and corners) rather than the full ring perimeter;
/// coverage of skipped cells comes from the focus moving between ticks.
const RING_PROBES: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

pub struct StreamingController {
    world: Arc<World>,
    workers: MeshWorkerPool,
    limiter: Arc<LoadLimiter>,
    pending_bind: Mutex<Vec<ClusterPos>>,
    index: Mutex<Octree<ClusterHandle>>,
    indexed: Mutex<HashSet<ClusterPos>>,
    ring_radius: i32,
    evict_margin: i32,
}

impl StreamingController {
    pub fn new(world: Arc<World>, workers: MeshWorkerPool, limiter: Arc<LoadLimiter>) -> Self {
        let ring_radius = world.config.cluster.ring_radius as i32;
        let evict_margin = world.config.cluster.evict_margin as i32;
        let spatial = &world.config.spatial;
        let index = Octree::with_limits(spatial.max_objects, spatial.max_depth);
        Self {
            world,
            workers,
            limiter,
            pending_bind: Mutex::new(Vec::new()),
            index: Mutex::new(index),
            indexed: Mutex::new(HashSet::new()),
            ring_radius,
            evict_margin,
        }
    }

    /// One streaming tick around `focus`.
    pub fn update(&self, focus: Vec3) {
        self.limiter.update_frame();
        self.drain_completions();

        let hv = self.world.map.hv_size();
        let center = ClusterPos::containing_point(focus, hv);
        self.probe(center);
        for ring in 1..=self.ring_radius {
            for (dh, dv) in RING_PROBES {
                self.probe(center.offset(dh * ring, dv * ring, hv));
            }
        }

        self.evict(center);
        self.reindex();
    }

    /// Advances one probed position: request the cluster if absent,
    /// dispatch a build once data exists, re-queue binding if geometry sits
    /// unbound.
    fn probe(&self, pos: ClusterPos) {
        let cluster = match self.world.map.get_cluster(pos) {
            Some(cluster) => cluster,
            None => {
                self.world.events.raise_need_cluster(pos);
                return;
            }
        };
        match cluster.status() {
            ClusterStatus::Generated => {
                // start_geo is the dedup gate: false means a build is
                // already in flight.
                if cluster.start_geo() {
                    self.workers.submit(BuildJob {
                        pos,
                        cluster: cluster.clone(),
                        neighbors: self.world.map.neighbors_of(pos),
                    });
                }
            }
            ClusterStatus::GeometryCreated => {
                cluster.request_binding();
                self.limiter.add_priority(pos);
            }
            ClusterStatus::Raw | ClusterStatus::GeometryPending | ClusterStatus::GeometryBound => {}
        }
    }

    fn drain_completions(&self) {
        for result in self.workers.completions().try_iter() {
            let cluster = match self.world.map.get_cluster(result.pos) {
                Some(cluster) => cluster,
                None => {
                    debug!("discarding build for evicted cluster {}", result.pos);
                    continue;
                }
            };
            // Anything but a pending build means the cluster was dirtied or
            // reset while the worker ran; the result is stale.
            if cluster.status() != ClusterStatus::GeometryPending {
                debug!("discarding stale build for cluster {}", result.pos);
                continue;
            }
            cluster.update_geo(result.geometry);
            cluster.request_binding();
            self.limiter.add_priority(result.pos);
        }
    }

    /// Geometry handoffs permitted this tick, at most the limiter's budget.
    /// Clusters kept back stay queued for the next tick.
    pub fn next_bindings(&self) -> Vec<(ClusterPos, ClusterGeometry)> {
        let mut pending = self.pending_bind.lock();
        for pos in self.world.events.geo_refresh_events().try_iter() {
            if !pending.contains(&pos) {
                pending.push(pos);
            }
        }

        let mut out = Vec::new();
        pending.retain(|&pos| {
            let cluster = match self.world.map.get_cluster(pos) {
                Some(cluster) => cluster,
                None => {
                    self.limiter.remove_priority(pos);
                    return false;
                }
            };
            if cluster.status() != ClusterStatus::GeometryCreated || !cluster.need_binding() {
                // Dirtied or reset since it queued; its priority slot must
                // go too, or it wedges the limiter's leading window.
                self.limiter.remove_priority(pos);
                return false;
            }
            if !self.limiter.can_load(pos) {
                return true;
            }
            match cluster.take_geometry() {
                Some(geometry) => {
                    cluster.finalize_bind();
                    out.push((pos, geometry));
                    false
                }
                // Dirtied between the status check and the take.
                None => false,
            }
        });
        out
    }

    fn evict(&self, center: ClusterPos) {
        let hv = self.world.map.hv_size();
        let horizon = self.ring_radius + self.evict_margin;
        let evicted: HashSet<ClusterPos> = self
            .world
            .map
            .cluster_positions()
            .into_iter()
            .filter(|pos| center.ring_distance(pos, hv) > horizon)
            .collect();
        if evicted.is_empty() {
            return;
        }

        for pos in &evicted {
            debug!("evicting cluster {pos}");
            self.world.map.remove_cluster(*pos);
            // The rendering collaborator releases whatever it bound for
            // this origin.
            self.world.events.raise_evicted(*pos);
        }
        self.index
            .lock()
            .extract_where(|handle| evicted.contains(&handle.origin));
        let mut indexed = self.indexed.lock();
        for pos in &evicted {
            indexed.remove(pos);
        }
        self.pending_bind.lock().retain(|pos| !evicted.contains(pos));
        // Stale priority entries would wedge the limiter's leading window
        // and starve every surviving cluster.
        self.limiter.retain_priority(|pos| !evicted.contains(pos));
    }

    /// Folds clusters created since the last tick into the spatial index.
    fn reindex(&self) {
        let mut indexed = self.indexed.lock();
        let mut fresh = Vec::new();
        for pos in self.world.map.cluster_positions() {
            if indexed.insert(pos) {
                if let Some(cluster) = self.world.map.get_cluster(pos) {
                    fresh.push(ClusterHandle {
                        origin: pos,
                        bounds: cluster.bounds(),
                    });
                }
            }
        }
        if !fresh.is_empty() {
            self.index.lock().insert(fresh);
        }
    }

    /// Origins of loaded clusters whose bounds touch the frustum.
    pub fn visible_clusters(&self, frustum: &ViewFrustum) -> Vec<ClusterPos> {
        self.index
            .lock()
            .objects_in_frustum(frustum)
            .into_iter()
            .map(|handle| handle.origin)
            .collect()
    }
}
