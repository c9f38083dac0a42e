//! Aggregate engine configuration, loadable from TOML. Every section and
//! field is optional in the file; omissions fall back to the defaults.

use crate::config::clustersys::ClusterSysConfig;
use crate::config::lighting::LightConfig;
use crate::config::spatial::SpatialConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cluster: ClusterSysConfig,
    pub spatial: SpatialConfig,
    pub lighting: LightConfig,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
