//! World model: block values and definitions, the deduplicating catalog,
//! clusters and their lifecycle, the loaded-cluster map and persistence.

pub mod block;
pub mod block_def;
pub mod catalog;
pub mod cluster;
pub mod cluster_pos;
pub mod events;
pub mod map;
pub mod storage;

pub use block::{Block, BlockShape, ColumnProfile, RampDir};
pub use block_def::{BlockDef, BlockDefRegistry, RegistryError, TextureId, TEXTURE_NONE};
pub use catalog::BlockCatalog;
pub use cluster::{Cluster, ClusterStatus};
pub use cluster_pos::ClusterPos;
pub use events::WorldEvents;
pub use map::{World, WorldMap};
pub use storage::{
    load_cluster, load_cluster_from_dir, load_geometry, save_cluster, save_cluster_to_dir,
    save_geometry, StorageError,
};
