//! Streaming voxel world core.
//!
//! Blocks live in 32x32x32 clusters keyed by 2D origin; a streaming
//! controller probes a ring of positions around the focus each tick, asks
//! the terrain-content collaborator for missing clusters, meshes ready ones
//! on a worker pool and hands finished geometry to the rendering
//! collaborator under a per-tick bind cap. Rendering, terrain content and
//! persistence policy are all collaborator concerns; this crate owns the
//! data model, the meshing and the streaming schedule.

pub mod config;
pub mod engine;
pub mod mesh;
pub mod spatial;
pub mod stream;
pub mod utils;
pub mod world;

pub use config::EngineConfig;
pub use engine::Engine;
pub use mesh::{ClusterGeometry, MeshVertex};
pub use world::{Block, BlockShape, ClusterPos, ClusterStatus, World};
