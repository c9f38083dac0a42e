//! Deduplicating cache assigning a compact 16-bit index to every distinct
//! block value used anywhere in a world. Indices are append-only for the
//! process lifetime; clusters store indices, never block values.

use crate::world::block::Block;
use parking_lot::Mutex;

/// Lookup-or-insert cache over block values.
///
/// Index 0 is reserved for `Block::EMPTY`. Mesh-build workers register
/// blocks concurrently during generation, so mutation is serialized under a
/// single lock; the scan is linear, which is fine at the thousands of
/// distinct values a world actually uses.
pub struct BlockCatalog {
    blocks: Mutex<Vec<Block>>,
}

impl BlockCatalog {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(vec![Block::EMPTY]),
        }
    }

    /// Returns the index for `block`, registering it on first use.
    ///
    /// # Panics
    ///
    /// Registering the `Block::INVALID` boundary sentinel is a caller
    /// contract violation.
    pub fn add(&self, block: Block) -> u16 {
        assert!(
            !block.shape.is_invalid(),
            "attempted to register the invalid boundary sentinel in the block catalog"
        );

        let mut blocks = self.blocks.lock();
        if let Some(index) = blocks.iter().position(|b| *b == block) {
            return index as u16;
        }
        assert!(
            blocks.len() <= u16::MAX as usize,
            "block catalog exhausted its 16-bit index space"
        );
        blocks.push(block);
        (blocks.len() - 1) as u16
    }

    /// Resolves an index. Index 0 and any out-of-range index resolve to
    /// `Block::EMPTY`; a stale index is a rendering artifact, not an error.
    pub fn get(&self, index: u16) -> Block {
        self.blocks
            .lock()
            .get(index as usize)
            .copied()
            .unwrap_or(Block::EMPTY)
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}

impl Default for BlockCatalog {
    fn default() -> Self {
        Self::new()
    }
}
