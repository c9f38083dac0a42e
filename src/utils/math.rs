//! Geometric types shared by the spatial index, mesh builder and streaming
//! layer: axis-aligned boxes and frustum planes.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box enclosing nothing; `union` with any real box yields that box.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    pub fn inside_sphere(&self, center: Vec3, radius: f32) -> bool {
        let r2 = radius * radius;
        self.corners()
            .iter()
            .all(|c| c.distance_squared(center) <= r2)
    }
}

/// Geometric plane in `normal . p + distance = 0` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    pub fn normalize(&mut self) {
        let length = self.normal.length();
        if length > 0.0 {
            self.normal /= length;
            self.distance /= length;
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// View frustum for culling. Containment and intersection are evaluated by
/// testing all 8 corners of a box against all 6 planes.
#[derive(Debug, Clone)]
pub struct ViewFrustum {
    pub planes: [Plane; 6],
}

impl ViewFrustum {
    pub fn from_matrices(view: &Mat4, proj: &Mat4) -> Self {
        let m = *proj * *view;
        let row = |f: fn(glam::Vec4) -> f32, sign: f32| Plane {
            normal: Vec3::new(
                m.x_axis.w + sign * f(m.x_axis),
                m.y_axis.w + sign * f(m.y_axis),
                m.z_axis.w + sign * f(m.z_axis),
            ),
            distance: m.w_axis.w + sign * f(m.w_axis),
        };

        let mut planes = [
            row(|a| a.x, 1.0),  // left
            row(|a| a.x, -1.0), // right
            row(|a| a.y, 1.0),  // bottom
            row(|a| a.y, -1.0), // top
            row(|a| a.z, 1.0),  // near
            row(|a| a.z, -1.0), // far
        ];
        for plane in &mut planes {
            plane.normalize();
        }
        Self { planes }
    }

    /// Frustum from 6 explicit planes; used by tests and by renderers that
    /// extract planes themselves.
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }

    /// Every corner inside the half-space of every plane.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        let corners = aabb.corners();
        self.planes
            .iter()
            .all(|plane| corners.iter().all(|c| plane.signed_distance(*c) >= 0.0))
    }

    /// Fast-rejects when any single plane has all 8 corners outside it.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let corners = aabb.corners();
        for plane in &self.planes {
            if corners.iter().all(|c| plane.signed_distance(*c) < 0.0) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn union_grows_both_ways() {
        let a = unit_box();
        let b = Aabb::new(Vec3::splat(-2.0), Vec3::splat(-1.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-2.0));
        assert_eq!(u.max, Vec3::ONE);
    }

    #[test]
    fn containment_is_inclusive() {
        let outer = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        assert!(outer.contains_aabb(&unit_box()));
        assert!(outer.contains_aabb(&outer));
        assert!(!unit_box().contains_aabb(&outer));
    }

    #[test]
    fn frustum_corner_tests() {
        // Axis-aligned "frustum": the box [0,10]^3 expressed as 6 planes.
        let planes = [
            Plane::new(Vec3::X, 0.0),
            Plane::new(-Vec3::X, 10.0),
            Plane::new(Vec3::Y, 0.0),
            Plane::new(-Vec3::Y, 10.0),
            Plane::new(Vec3::Z, 0.0),
            Plane::new(-Vec3::Z, 10.0),
        ];
        let frustum = ViewFrustum::from_planes(planes);

        let inside = Aabb::new(Vec3::splat(1.0), Vec3::splat(2.0));
        let straddling = Aabb::new(Vec3::splat(9.0), Vec3::splat(12.0));
        let outside = Aabb::new(Vec3::splat(11.0), Vec3::splat(12.0));

        assert!(frustum.contains_aabb(&inside));
        assert!(frustum.intersects_aabb(&inside));
        assert!(!frustum.contains_aabb(&straddling));
        assert!(frustum.intersects_aabb(&straddling));
        assert!(!frustum.intersects_aabb(&outside));
    }

}
