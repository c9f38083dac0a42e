//! Engine configuration sections and the TOML loader.

pub mod clustersys;
pub mod core;
pub mod lighting;
pub mod spatial;

pub use clustersys::{ClusterSysConfig, CullingMode};
pub use core::{ConfigError, EngineConfig};
pub use lighting::LightConfig;
pub use spatial::SpatialConfig;
