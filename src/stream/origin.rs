//! Floating origin. World coordinates drift into float imprecision a few
//! kilometers out, so render-facing positions are kept relative to a movable
//! origin; when the focus wanders far enough the origin snaps to it and
//! every subscriber shifts its local frame by the same delta.

use glam::Vec3;
use parking_lot::Mutex;
use std::sync::Weak;

/// Implemented by anything holding origin-relative state.
pub trait OriginAware: Send + Sync {
    /// The origin moved from `old` to `new`; subtract `new - old` from any
    /// cached local positions.
    fn origin_changed(&self, old: Vec3, new: Vec3);
}

pub struct FloatingOrigin {
    origin: Mutex<Vec3>,
    listeners: Mutex<Vec<Weak<dyn OriginAware>>>,
}

impl FloatingOrigin {
    pub fn new() -> Self {
        Self {
            origin: Mutex::new(Vec3::ZERO),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn origin(&self) -> Vec3 {
        *self.origin.lock()
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        world - self.origin()
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local + self.origin()
    }

    pub fn subscribe(&self, listener: Weak<dyn OriginAware>) {
        self.listeners.lock().push(listener);
    }

    /// Moves the origin and notifies every live subscriber exactly once.
    /// Dropped subscribers are pruned on the way through.
    pub fn rebase_to(&self, new: Vec3) {
        let old = {
            let mut origin = self.origin.lock();
            let old = *origin;
            if old == new {
                return;
            }
            *origin = new;
            old
        };

        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| match listener.upgrade() {
            Some(live) => {
                live.origin_changed(old, new);
                true
            }
            None => false,
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for FloatingOrigin {
    fn default() -> Self {
        Self::new()
    }
}

/// A position stored origin-relative. Its world position is invariant across
/// rebases.
pub struct AnchoredPosition {
    local: Mutex<Vec3>,
}

impl AnchoredPosition {
    /// Anchors a world-space point against the origin's current value.
    pub fn new(world: Vec3, origin: &FloatingOrigin) -> Self {
        Self {
            local: Mutex::new(origin.to_local(world)),
        }
    }

    pub fn local(&self) -> Vec3 {
        *self.local.lock()
    }

    pub fn world_position(&self, origin: &FloatingOrigin) -> Vec3 {
        origin.to_world(self.local())
    }

    pub fn set_world(&self, world: Vec3, origin: &FloatingOrigin) {
        *self.local.lock() = origin.to_local(world);
    }
}

impl OriginAware for AnchoredPosition {
    fn origin_changed(&self, old: Vec3, new: Vec3) {
        *self.local.lock() += old - new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn world_positions_survive_a_rebase() {
        let origin = FloatingOrigin::new();
        let anchor = Arc::new(AnchoredPosition::new(Vec3::new(100.0, 5.0, -40.0), &origin));
        origin.subscribe(Arc::downgrade(&anchor) as Weak<dyn OriginAware>);

        origin.rebase_to(Vec3::new(64.0, 0.0, -32.0));
        let world = anchor.world_position(&origin);
        assert!((world - Vec3::new(100.0, 5.0, -40.0)).length() < 1e-5);

        // Local coordinates shrank accordingly.
        assert!((anchor.local() - Vec3::new(36.0, 5.0, -8.0)).length() < 1e-5);
    }

    #[test]
    fn rebase_to_same_origin_is_a_no_op() {
        struct Counter(Mutex<usize>);
        impl OriginAware for Counter {
            fn origin_changed(&self, _: Vec3, _: Vec3) {
                *self.0.lock() += 1;
            }
        }

        let origin = FloatingOrigin::new();
        let counter = Arc::new(Counter(Mutex::new(0)));
        origin.subscribe(Arc::downgrade(&counter) as Weak<dyn OriginAware>);

        origin.rebase_to(Vec3::ZERO);
        assert_eq!(*counter.0.lock(), 0);
        origin.rebase_to(Vec3::ONE);
        origin.rebase_to(Vec3::ONE);
        assert_eq!(*counter.0.lock(), 1);
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let origin = FloatingOrigin::new();
        let anchor = Arc::new(AnchoredPosition::new(Vec3::ZERO, &origin));
        origin.subscribe(Arc::downgrade(&anchor) as Weak<dyn OriginAware>);
        assert_eq!(origin.listener_count(), 1);

        drop(anchor);
        origin.rebase_to(Vec3::ONE);
        assert_eq!(origin.listener_count(), 0);
    }
}
