//! Loose object octree used for visibility queries: which clusters (or any
//! other bounded objects) fall inside a frustum, box or sphere.
//!
//! The tree is rebuilt-on-insert rather than incrementally balanced: an
//! insert gathers every stored object plus the new ones, recomputes the root
//! bounds as their union and redistributes. Rebuilds happen at streaming
//! cadence (a few clusters per tick), not per frame, so simplicity wins.

use crate::utils::math::{Aabb, ViewFrustum};
use glam::Vec3;

pub const DEFAULT_MAX_OBJECTS: usize = 8;
pub const DEFAULT_MAX_DEPTH: usize = 40;

/// Anything storable in the octree.
pub trait HasBounds {
    fn bounds(&self) -> Aabb;
}

struct OctreeNode<T> {
    bounds: Aabb,
    depth: usize,
    objects: Vec<T>,
    children: Option<Box<[OctreeNode<T>; 8]>>,
}

pub struct Octree<T: HasBounds + Clone> {
    root: Option<OctreeNode<T>>,
    max_objects: usize,
    max_depth: usize,
    len: usize,
}

impl<T: HasBounds + Clone> Octree<T> {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_OBJECTS, DEFAULT_MAX_DEPTH)
    }

    pub fn with_limits(max_objects: usize, max_depth: usize) -> Self {
        Self {
            root: None,
            max_objects,
            max_depth,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Adds `items`, growing the root bounds to the union of everything
    /// stored and redistributing all objects over the refreshed tree.
    pub fn insert(&mut self, items: Vec<T>) {
        let mut all = self.drain_all();
        all.extend(items);
        self.len = all.len();
        if all.is_empty() {
            self.root = None;
            return;
        }

        let mut bounds = all[0].bounds();
        for item in &all[1..] {
            bounds = bounds.union(&item.bounds());
        }

        let mut root = OctreeNode {
            bounds,
            depth: 0,
            objects: Vec::new(),
            children: None,
        };
        for item in all {
            root.insert(item, self.max_objects, self.max_depth);
        }
        self.root = Some(root);
    }

    /// Removes and returns every object for which `predicate` holds; the
    /// rest are redistributed.
    pub fn extract_where<F: Fn(&T) -> bool>(&mut self, predicate: F) -> Vec<T> {
        let all = self.drain_all();
        let (extracted, kept): (Vec<T>, Vec<T>) = all.into_iter().partition(|t| predicate(t));
        self.len = 0;
        self.insert(kept);
        extracted
    }

    fn drain_all(&mut self) -> Vec<T> {
        let mut all = Vec::with_capacity(self.len);
        if let Some(root) = self.root.take() {
            root.drain_into(&mut all);
        }
        all
    }

    pub fn objects_in_frustum(&self, frustum: &ViewFrustum) -> Vec<T> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.query(
                &mut out,
                &|bounds| frustum.contains_aabb(bounds),
                &|bounds| frustum.intersects_aabb(bounds),
            );
        }
        out
    }

    pub fn objects_in_box(&self, query: &Aabb) -> Vec<T> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.query(
                &mut out,
                &|bounds| query.contains_aabb(bounds),
                &|bounds| query.intersects(bounds),
            );
        }
        out
    }

    pub fn objects_in_sphere(&self, center: Vec3, radius: f32) -> Vec<T> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.query(
                &mut out,
                &|bounds| bounds.inside_sphere(center, radius),
                &|bounds| bounds.intersects_sphere(center, radius),
            );
        }
        out
    }
}

impl<T: HasBounds + Clone> Default for Octree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HasBounds + Clone> OctreeNode<T> {
    fn insert(&mut self, item: T, max_objects: usize, max_depth: usize) {
        if let Some(children) = &mut self.children {
            let item_bounds = item.bounds();
            for child in children.iter_mut() {
                if child.bounds.contains_aabb(&item_bounds) {
                    child.insert(item, max_objects, max_depth);
                    return;
                }
            }
            // Straddles a split plane: lives at this node.
            self.objects.push(item);
            return;
        }

        self.objects.push(item);
        if self.objects.len() > max_objects && self.depth < max_depth {
            self.split(max_objects, max_depth);
        }
    }

    fn split(&mut self, max_objects: usize, max_depth: usize) {
        let center = self.bounds.center();
        let min = self.bounds.min;
        let max = self.bounds.max;

        let octant = |i: usize| {
            let low = Vec3::new(
                if i & 1 == 0 { min.x } else { center.x },
                if i & 2 == 0 { min.y } else { center.y },
                if i & 4 == 0 { min.z } else { center.z },
            );
            let high = Vec3::new(
                if i & 1 == 0 { center.x } else { max.x },
                if i & 2 == 0 { center.y } else { max.y },
                if i & 4 == 0 { center.z } else { max.z },
            );
            OctreeNode {
                bounds: Aabb::new(low, high),
                depth: self.depth + 1,
                objects: Vec::new(),
                children: None,
            }
        };
        self.children = Some(Box::new([
            octant(0),
            octant(1),
            octant(2),
            octant(3),
            octant(4),
            octant(5),
            octant(6),
            octant(7),
        ]));

        let objects = std::mem::take(&mut self.objects);
        for item in objects {
            self.insert(item, max_objects, max_depth);
        }
    }

    fn drain_into(self, out: &mut Vec<T>) {
        out.extend(self.objects);
        if let Some(children) = self.children {
            for child in *children {
                child.drain_into(out);
            }
        }
    }

    fn collect_all(&self, out: &mut Vec<T>) {
        out.extend(self.objects.iter().cloned());
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_all(out);
            }
        }
    }

    /// Generic query over a (full containment, overlap) predicate pair. A
    /// fully contained node dumps its subtree without further tests.
    fn query(
        &self,
        out: &mut Vec<T>,
        contains: &dyn Fn(&Aabb) -> bool,
        overlaps: &dyn Fn(&Aabb) -> bool,
    ) {
        if !overlaps(&self.bounds) {
            return;
        }
        if contains(&self.bounds) {
            self.collect_all(out);
            return;
        }
        for item in &self.objects {
            if overlaps(&item.bounds()) {
                out.push(item.clone());
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(out, contains, overlaps);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[derive(Debug, Clone, PartialEq)]
    struct Box3 {
        id: u32,
        bounds: Aabb,
    }

    impl HasBounds for Box3 {
        fn bounds(&self) -> Aabb {
            self.bounds
        }
    }

    fn unit_box(id: u32, at: Vec3) -> Box3 {
        Box3 {
            id,
            bounds: Aabb::new(at, at + Vec3::ONE),
        }
    }

    fn grid(n: i32) -> Vec<Box3> {
        let mut out = Vec::new();
        let mut id = 0;
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    out.push(unit_box(
                        id,
                        Vec3::new(x as f32 * 2.0, y as f32 * 2.0, z as f32 * 2.0),
                    ));
                    id += 1;
                }
            }
        }
        out
    }

    #[test]
    fn root_box_query_returns_each_object_exactly_once() {
        let mut tree = Octree::new();
        tree.insert(grid(4));
        assert_eq!(tree.len(), 64);

        let everything = Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0));
        let mut found = tree.objects_in_box(&everything);
        assert_eq!(found.len(), 64);
        found.sort_by_key(|b| b.id);
        found.dedup_by_key(|b| b.id);
        assert_eq!(found.len(), 64);
    }

    #[test]
    fn box_query_filters_by_overlap() {
        let mut tree = Octree::new();
        tree.insert(grid(4));

        // Covers the 2x2x2 corner of the grid.
        let corner = Aabb::new(Vec3::splat(-0.5), Vec3::splat(3.5));
        assert_eq!(tree.objects_in_box(&corner).len(), 8);
    }

    #[test]
    fn sphere_query_respects_radius() {
        let mut tree = Octree::new();
        tree.insert(grid(4));

        let near = tree.objects_in_sphere(Vec3::splat(0.5), 1.0);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].id, 0);

        let all = tree.objects_in_sphere(Vec3::splat(3.0), 100.0);
        assert_eq!(all.len(), 64);
    }

    #[test]
    fn frustum_query_sees_what_the_camera_sees() {
        let mut tree = Octree::new();
        tree.insert(grid(4));

        // Camera above the grid looking straight down.
        let view = Mat4::look_at_rh(
            Vec3::new(3.0, 50.0, 3.0),
            Vec3::new(3.0, 0.0, 3.0),
            Vec3::Z,
        );
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 200.0);
        let frustum = ViewFrustum::from_matrices(&view, &proj);

        let visible = tree.objects_in_frustum(&frustum);
        assert!(!visible.is_empty());
        assert!(visible.len() <= 64);

        // Camera looking away from the grid sees nothing.
        let away = Mat4::look_at_rh(
            Vec3::new(3.0, 50.0, 3.0),
            Vec3::new(3.0, 100.0, 3.0),
            Vec3::Z,
        );
        let frustum = ViewFrustum::from_matrices(&away, &proj);
        assert!(tree.objects_in_frustum(&frustum).is_empty());
    }

    #[test]
    fn incremental_inserts_accumulate() {
        let mut tree = Octree::new();
        tree.insert(vec![unit_box(1, Vec3::ZERO)]);
        tree.insert(vec![unit_box(2, Vec3::splat(10.0))]);
        assert_eq!(tree.len(), 2);

        let everything = Aabb::new(Vec3::splat(-1.0), Vec3::splat(12.0));
        assert_eq!(tree.objects_in_box(&everything).len(), 2);
    }

    #[test]
    fn extract_where_removes_matches() {
        let mut tree = Octree::new();
        tree.insert(grid(2));
        let removed = tree.extract_where(|b| b.id < 4);
        assert_eq!(removed.len(), 4);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn deep_split_stays_bounded() {
        // Many coincident objects cannot be separated by splitting; the
        // depth limit stops recursion.
        let mut tree = Octree::with_limits(2, 4);
        let stack: Vec<Box3> = (0..32).map(|id| unit_box(id, Vec3::ZERO)).collect();
        tree.insert(stack);
        assert_eq!(tree.len(), 32);

        let everything = Aabb::new(Vec3::splat(-1.0), Vec3::splat(2.0));
        assert_eq!(tree.objects_in_box(&everything).len(), 32);
    }
}
