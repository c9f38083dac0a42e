//! Per-tick cap on geometry bindings. Uploads are the expensive main-thread
//! step, so at most `load_limit` clusters bind per tick; a priority list lets
//! the ring scan push the clusters nearest the focus to the front.

use crate::world::cluster_pos::ClusterPos;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct LimiterState {
    used: usize,
    priority: Vec<ClusterPos>,
    last_bind: Option<Instant>,
}

pub struct LoadLimiter {
    state: Mutex<LimiterState>,
    load_limit: usize,
    min_bind_interval: Option<Duration>,
}

impl LoadLimiter {
    pub fn new(load_limit: usize, min_bind_interval: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                used: 0,
                priority: Vec::new(),
                last_bind: None,
            }),
            load_limit,
            min_bind_interval,
        }
    }

    /// Resets the per-tick budget. Call once at the top of every tick.
    pub fn update_frame(&self) {
        self.state.lock().used = 0;
    }

    /// Puts `pos` on the priority list; while the list is non-empty only its
    /// leading entries may bind.
    pub fn add_priority(&self, pos: ClusterPos) {
        let mut state = self.state.lock();
        if !state.priority.contains(&pos) {
            state.priority.push(pos);
        }
    }

    pub fn priority_len(&self) -> usize {
        self.state.lock().priority.len()
    }

    /// Drops `pos` from the priority list if queued. Entries for clusters
    /// that can no longer bind must be removed this way; a stale entry in
    /// the leading window blocks every live cluster behind it.
    pub fn remove_priority(&self, pos: ClusterPos) {
        self.state.lock().priority.retain(|p| *p != pos);
    }

    /// Keeps only the priority entries for which `keep` holds; the eviction
    /// path uses this to purge a whole batch at once.
    pub fn retain_priority<F: FnMut(&ClusterPos) -> bool>(&self, keep: F) {
        self.state.lock().priority.retain(keep);
    }

    /// Whether `pos` may bind now. Consumes one unit of this tick's budget
    /// (and `pos`'s priority slot) when it returns true.
    pub fn can_load(&self, pos: ClusterPos) -> bool {
        let mut state = self.state.lock();
        if state.used >= self.load_limit {
            return false;
        }
        if let (Some(interval), Some(last)) = (self.min_bind_interval, state.last_bind) {
            if last.elapsed() < interval {
                return false;
            }
        }
        if !state.priority.is_empty() {
            let window = self.load_limit.min(state.priority.len());
            match state.priority[..window].iter().position(|p| *p == pos) {
                Some(slot) => {
                    state.priority.remove(slot);
                }
                None => return false,
            }
        }
        state.used += 1;
        state.last_bind = Some(Instant::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(i: i32) -> ClusterPos {
        ClusterPos::new(i * 32, 0)
    }

    #[test]
    fn budget_caps_binds_per_tick() {
        let limiter = LoadLimiter::new(3, None);
        let granted = (0..10).filter(|i| limiter.can_load(pos(*i))).count();
        assert_eq!(granted, 3);

        limiter.update_frame();
        assert!(limiter.can_load(pos(99)));
    }

    #[test]
    fn priority_entries_preempt_the_queue() {
        let limiter = LoadLimiter::new(3, None);
        limiter.add_priority(pos(7));

        // A non-priority cluster is held back while the list is populated.
        assert!(!limiter.can_load(pos(1)));
        assert!(limiter.can_load(pos(7)));

        // List drained: ordinary clusters flow again.
        assert!(limiter.can_load(pos(1)));
    }

    #[test]
    fn priority_window_is_the_load_limit() {
        let limiter = LoadLimiter::new(2, None);
        for i in 0..5 {
            limiter.add_priority(pos(i));
        }
        // Entry 4 sits outside the leading window of 2.
        assert!(!limiter.can_load(pos(4)));
        assert!(limiter.can_load(pos(0)));
        assert!(limiter.can_load(pos(1)));
    }

    #[test]
    fn priority_adds_are_deduplicated() {
        let limiter = LoadLimiter::new(3, None);
        limiter.add_priority(pos(1));
        limiter.add_priority(pos(1));
        assert_eq!(limiter.priority_len(), 1);
    }

    #[test]
    fn removed_priority_entries_unblock_the_window() {
        let limiter = LoadLimiter::new(1, None);
        limiter.add_priority(pos(1));

        // The queued entry holds the whole window.
        assert!(!limiter.can_load(pos(2)));

        // Once it is removed (the cluster went away), live clusters bind.
        limiter.remove_priority(pos(1));
        assert!(limiter.can_load(pos(2)));
    }

    #[test]
    fn retain_priority_purges_a_batch() {
        let limiter = LoadLimiter::new(3, None);
        for i in 0..6 {
            limiter.add_priority(pos(i));
        }
        limiter.retain_priority(|p| p.h >= 3 * 32);
        assert_eq!(limiter.priority_len(), 3);
        assert!(limiter.can_load(pos(3)));
    }

    #[test]
    fn bind_interval_gates_back_to_back_binds() {
        let limiter = LoadLimiter::new(3, Some(Duration::from_secs(60)));
        assert!(limiter.can_load(pos(1)));
        assert!(!limiter.can_load(pos(2)));
    }
}
