//! Block definitions: the textures and transparency for a block type,
//! registered once and looked up by integer id during meshing.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Identifier of a texture known to the rendering collaborator.
pub type TextureId = u32;

/// Marker for "no texture in this slot"; the side-texture fallback skips it.
pub const TEXTURE_NONE: TextureId = 0;

pub const CARDINAL_SIDES: usize = 4;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read block definition file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse block definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("block definition error: {0}")]
    Definition(String),
}

/// Visual description of a block type.
///
/// `side_textures` is indexed North, South, East, West. Empty slots inherit
/// the previous non-empty slot ("last non-empty wins"), so a definition can
/// name a single side texture and cover all four cardinals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDef {
    pub name: String,
    pub top_texture: TextureId,
    pub side_textures: [TextureId; CARDINAL_SIDES],
    pub bottom_texture: TextureId,
    pub transparent: bool,
}

impl BlockDef {
    /// Uniform definition using one texture on every face.
    pub fn uniform(name: &str, texture: TextureId) -> Self {
        Self {
            name: name.to_string(),
            top_texture: texture,
            side_textures: [texture, TEXTURE_NONE, TEXTURE_NONE, TEXTURE_NONE],
            bottom_texture: texture,
            transparent: false,
        }
    }

    /// Side texture for a cardinal slot with the inherit-previous fallback.
    pub fn side_texture(&self, slot: usize) -> TextureId {
        let mut resolved = self.side_textures[0];
        for i in 0..=slot.min(CARDINAL_SIDES - 1) {
            if self.side_textures[i] != TEXTURE_NONE {
                resolved = self.side_textures[i];
            }
        }
        resolved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBlockDef {
    name: String,
    top_texture: TextureId,
    #[serde(default)]
    side_textures: Vec<TextureId>,
    bottom_texture: TextureId,
    #[serde(default)]
    transparent: bool,
}

/// Append-only registry of block definitions, id = insertion order.
///
/// Id 0 is always the built-in "air" definition so that `Block::EMPTY`
/// resolves without a special case. Definitions are never removed or mutated
/// once registered; worker threads read concurrently.
pub struct BlockDefRegistry {
    defs: RwLock<Vec<BlockDef>>,
}

impl BlockDefRegistry {
    pub fn new() -> Self {
        let mut air = BlockDef::uniform("air", TEXTURE_NONE);
        air.transparent = true;
        Self {
            defs: RwLock::new(vec![air]),
        }
    }

    /// Appends a definition and returns its id.
    ///
    /// # Panics
    ///
    /// When the 16-bit id space is exhausted; a wrapped id would silently
    /// alias an existing definition.
    pub fn register(&self, def: BlockDef) -> u16 {
        let mut defs = self.defs.write();
        assert!(
            defs.len() <= u16::MAX as usize,
            "block definition registry exhausted its 16-bit id space"
        );
        defs.push(def);
        (defs.len() - 1) as u16
    }

    /// None for ids never registered; meshing treats those blocks as empty.
    pub fn get(&self, id: u16) -> Option<BlockDef> {
        self.defs.read().get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.defs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.read().is_empty()
    }

    /// Loads every `*.json` definition in a directory, in filename order so
    /// that ids are stable across runs.
    pub fn load_from_dir(&self, dir: &Path) -> Result<usize, RegistryError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let contents = fs::read_to_string(&path)?;
            let raw: RawBlockDef = serde_json::from_str(&contents)?;
            self.register(Self::convert(raw)?);
            loaded += 1;
        }
        Ok(loaded)
    }

    fn convert(raw: RawBlockDef) -> Result<BlockDef, RegistryError> {
        if raw.name.is_empty() {
            return Err(RegistryError::Definition("empty block name".into()));
        }
        if raw.side_textures.len() > CARDINAL_SIDES {
            return Err(RegistryError::Definition(format!(
                "{}: more than {} side textures",
                raw.name, CARDINAL_SIDES
            )));
        }
        let mut side_textures = [TEXTURE_NONE; CARDINAL_SIDES];
        for (slot, tex) in raw.side_textures.iter().enumerate() {
            side_textures[slot] = *tex;
        }
        Ok(BlockDef {
            name: raw.name,
            top_texture: raw.top_texture,
            side_textures,
            bottom_texture: raw.bottom_texture,
            transparent: raw.transparent,
        })
    }
}

impl Default for BlockDefRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn air_is_id_zero() {
        let registry = BlockDefRegistry::new();
        let air = registry.get(0).unwrap();
        assert_eq!(air.name, "air");
        assert!(air.transparent);
    }

    #[test]
    fn side_textures_inherit_previous() {
        let mut def = BlockDef::uniform("stone", 7);
        def.side_textures = [7, TEXTURE_NONE, 9, TEXTURE_NONE];
        assert_eq!(def.side_texture(0), 7);
        assert_eq!(def.side_texture(1), 7);
        assert_eq!(def.side_texture(2), 9);
        assert_eq!(def.side_texture(3), 9);
    }

    #[test]
    #[should_panic(expected = "16-bit id space")]
    fn id_space_exhaustion_is_fatal() {
        let registry = BlockDefRegistry::new();
        // Air occupies id 0; u16::MAX more registrations fill the space,
        // and the next one must not wrap around to id 0.
        for i in 0..=u16::MAX as u32 {
            registry.register(BlockDef::uniform("filler", i));
        }
    }

    #[test]
    fn unknown_id_is_none() {
        let registry = BlockDefRegistry::new();
        assert!(registry.get(999).is_none());
    }

    #[test]
    fn loads_json_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = std::fs::File::create(dir.path().join("a_stone.json")).unwrap();
        write!(
            a,
            r#"{{"name":"stone","top_texture":1,"side_textures":[2],"bottom_texture":3}}"#
        )
        .unwrap();
        let mut b = std::fs::File::create(dir.path().join("b_water.json")).unwrap();
        write!(
            b,
            r#"{{"name":"water","top_texture":4,"bottom_texture":4,"transparent":true}}"#
        )
        .unwrap();

        let registry = BlockDefRegistry::new();
        assert_eq!(registry.load_from_dir(dir.path()).unwrap(), 2);
        assert_eq!(registry.get(1).unwrap().name, "stone");
        let water = registry.get(2).unwrap();
        assert_eq!(water.name, "water");
        assert!(water.transparent);
    }
}
