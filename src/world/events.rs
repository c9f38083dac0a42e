//! Notification channels between the voxel core and its collaborators.
//!
//! Each event fires exactly once per state change and is drained by whoever
//! polls the receiving end: the terrain-content collaborator consumes
//! `need_cluster`, the binding path consumes `geo_refresh`.

use crate::world::cluster_pos::ClusterPos;
use crossbeam_channel::{unbounded, Receiver, Sender};

pub struct WorldEvents {
    need_cluster_tx: Sender<ClusterPos>,
    need_cluster_rx: Receiver<ClusterPos>,
    geo_refresh_tx: Sender<ClusterPos>,
    geo_refresh_rx: Receiver<ClusterPos>,
    evicted_tx: Sender<ClusterPos>,
    evicted_rx: Receiver<ClusterPos>,
}

impl WorldEvents {
    pub fn new() -> Self {
        let (need_cluster_tx, need_cluster_rx) = unbounded();
        let (geo_refresh_tx, geo_refresh_rx) = unbounded();
        let (evicted_tx, evicted_rx) = unbounded();
        Self {
            need_cluster_tx,
            need_cluster_rx,
            geo_refresh_tx,
            geo_refresh_rx,
            evicted_tx,
            evicted_rx,
        }
    }

    /// Raised by the streaming controller when the ring scan probes a
    /// position with no cluster; the terrain-content collaborator reacts by
    /// creating and filling one.
    pub fn raise_need_cluster(&self, pos: ClusterPos) {
        let _ = self.need_cluster_tx.send(pos);
    }

    pub fn need_cluster_events(&self) -> &Receiver<ClusterPos> {
        &self.need_cluster_rx
    }

    /// Sender handed to clusters so `request_binding` can raise its
    /// once-per-dirty-period refresh notification.
    pub fn geo_refresh_sender(&self) -> Sender<ClusterPos> {
        self.geo_refresh_tx.clone()
    }

    pub fn geo_refresh_events(&self) -> &Receiver<ClusterPos> {
        &self.geo_refresh_rx
    }

    /// Raised once per cluster the streaming controller removes from the
    /// world map. The rendering collaborator reacts by releasing any
    /// buffers it holds for that origin; origins it never bound are ignored.
    pub fn raise_evicted(&self, pos: ClusterPos) {
        let _ = self.evicted_tx.send(pos);
    }

    pub fn evicted_events(&self) -> &Receiver<ClusterPos> {
        &self.evicted_rx
    }
}

impl Default for WorldEvents {
    fn default() -> Self {
        Self::new()
    }
}
