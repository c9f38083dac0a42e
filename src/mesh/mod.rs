//! Mesh generation: face culling, per-vertex lighting and the cluster
//! geometry builder.

pub mod builder;
pub mod culling;
pub mod geometry;
pub mod lighting;

pub use builder::{build_cluster_geometry, MeshContext, NeighborClusters};
pub use culling::{BinaryCulling, CullingStrategy, DirectionalCulling, FaceDir};
pub use geometry::{ClusterGeometry, Face, MeshBuffer, MeshGroup, MeshVertex};
pub use lighting::{
    vertex_luminance, LightOcclusion, AMBIENT_LUMINANCE, BACKFACE_LUMINANCE, LIT_LUMINANCE,
};
