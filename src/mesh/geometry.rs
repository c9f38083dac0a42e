//! Intermediate and finalized mesh records. Faces accumulate in per-texture
//! groups during a build and are finalized into flat vertex/index buffers
//! ready for upload by the rendering collaborator.

use crate::utils::math::Aabb;
use crate::world::block_def::TextureId;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// GPU-ready vertex layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub luminance: f32,
}

/// One emitted face: 3 or 4 world-space vertices with shared normal and
/// per-vertex luminance.
#[derive(Debug, Clone)]
pub struct Face {
    pub vertices: Vec<Vec3>,
    pub normal: Vec3,
    pub uvs: Vec<Vec2>,
    pub luminance: Vec<f32>,
}

impl Face {
    pub fn new(vertices: Vec<Vec3>, normal: Vec3, uvs: Vec<Vec2>, luminance: Vec<f32>) -> Self {
        debug_assert!(vertices.len() == 3 || vertices.len() == 4);
        debug_assert_eq!(vertices.len(), uvs.len());
        debug_assert_eq!(vertices.len(), luminance.len());
        Self {
            vertices,
            normal,
            uvs,
            luminance,
        }
    }
}

/// Accumulates faces for a single texture id.
#[derive(Debug, Clone)]
pub struct MeshGroup {
    pub texture: TextureId,
    faces: Vec<Face>,
}

impl MeshGroup {
    pub fn new(texture: TextureId) -> Self {
        Self {
            texture,
            faces: Vec::new(),
        }
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Flattens accumulated faces into an indexed triangle buffer; quads fan
    /// into two triangles sharing their first vertex.
    pub fn finalize(&self) -> MeshBuffer {
        let mut buffer = MeshBuffer {
            vertices: Vec::with_capacity(self.faces.len() * 4),
            indices: Vec::with_capacity(self.faces.len() * 6),
            face_count: self.faces.len(),
        };

        for face in &self.faces {
            let base = buffer.vertices.len() as u32;
            for ((pos, uv), lum) in face
                .vertices
                .iter()
                .zip(&face.uvs)
                .zip(&face.luminance)
            {
                buffer.vertices.push(MeshVertex {
                    position: pos.to_array(),
                    normal: face.normal.to_array(),
                    uv: uv.to_array(),
                    luminance: *lum,
                });
            }
            buffer.indices.extend([base, base + 1, base + 2]);
            if face.vertices.len() == 4 {
                buffer.indices.extend([base, base + 2, base + 3]);
            }
        }

        buffer
    }
}

/// Finalized triangle buffer for one texture id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub face_count: usize,
}

/// The renderable output of one cluster build: one buffer per texture id,
/// transparent materials in their own set, plus the cluster bounds for
/// culling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterGeometry {
    pub opaque: HashMap<TextureId, MeshBuffer>,
    pub transparent: HashMap<TextureId, MeshBuffer>,
    pub bounds: Aabb,
}

impl ClusterGeometry {
    pub fn empty(bounds: Aabb) -> Self {
        Self {
            opaque: HashMap::new(),
            transparent: HashMap::new(),
            bounds,
        }
    }

    pub fn total_faces(&self) -> usize {
        self.opaque
            .values()
            .chain(self.transparent.values())
            .map(|b| b.face_count)
            .sum()
    }

    pub fn total_vertices(&self) -> usize {
        self.opaque
            .values()
            .chain(self.transparent.values())
            .map(|b| b.vertices.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Face {
        Face::new(
            vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            Vec3::Z,
            vec![
                Vec2::ZERO,
                Vec2::new(1.0, 0.0),
                Vec2::ONE,
                Vec2::new(0.0, 1.0),
            ],
            vec![1.0; 4],
        )
    }

    #[test]
    fn quad_finalizes_to_two_triangles() {
        let mut group = MeshGroup::new(1);
        group.add_face(quad());
        let buffer = group.finalize();
        assert_eq!(buffer.vertices.len(), 4);
        assert_eq!(buffer.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(buffer.face_count, 1);
    }

    #[test]
    fn triangle_finalizes_to_three_indices() {
        let mut group = MeshGroup::new(1);
        group.add_face(Face::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            Vec3::Z,
            vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            vec![1.0; 3],
        ));
        let buffer = group.finalize();
        assert_eq!(buffer.vertices.len(), 3);
        assert_eq!(buffer.indices.len(), 3);
    }

    #[test]
    fn vertex_layout_is_pod() {
        let vertex = MeshVertex {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            uv: [0.5, 0.5],
            luminance: 1.0,
        };
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), std::mem::size_of::<MeshVertex>());
    }
}
