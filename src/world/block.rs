//! Block value types: a block is a (definition id, shape) pair. Shapes
//! resolve to a column-height model used by meshing, drop-height queries and
//! segment collision.
//!
//! Axis convention: `h` runs along world +X, `v` along world +Z, `d` along
//! world +Y (up). North is -v, South +v, East +h, West -h.

use serde::{Deserialize, Serialize};

/// Direction a ramp ascends toward; the named edge (or corner) is the high
/// side. Compound directions are corner ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RampDir {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

/// Geometric form of one voxel cell.
///
/// `Invalid` is the unloaded-boundary sentinel: it is never stored in a
/// cluster and never registered in the catalog, but neighbor sampling returns
/// it where no cluster exists so that boundary faces are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockShape {
    Empty,
    Solid,
    Fluid,
    FullRamp(RampDir),
    LowerHalf,
    UpperHalf,
    LowerRamp(RampDir),
    UpperRamp(RampDir),
    Invalid,
}

/// Solid column occupied by a shape within its cell: a flat floor and a top
/// height per column corner, in order (h=0,v=0), (h=1,v=0), (h=0,v=1),
/// (h=1,v=1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnProfile {
    pub floor: f32,
    pub tops: [f32; 4],
}

impl ColumnProfile {
    pub const EMPTY: ColumnProfile = ColumnProfile {
        floor: 0.0,
        tops: [0.0; 4],
    };

    pub const FULL: ColumnProfile = ColumnProfile {
        floor: 0.0,
        tops: [1.0; 4],
    };

    /// Bilinear top height at fractional in-cell coordinates.
    pub fn height_at(&self, fh: f32, fv: f32) -> f32 {
        let north = self.tops[0] + (self.tops[1] - self.tops[0]) * fh;
        let south = self.tops[2] + (self.tops[3] - self.tops[2]) * fh;
        north + (south - north) * fv
    }

    /// Whether the quad over the 4 corner tops is planar. Corner ramps are
    /// the non-planar case and get a split top quad.
    pub fn top_is_planar(&self) -> bool {
        (self.tops[0] + self.tops[3] - self.tops[1] - self.tops[2]).abs() < 1e-6
    }

    pub fn is_vacant(&self) -> bool {
        self.tops.iter().all(|&t| t <= self.floor)
    }
}

/// High corners for a ramp direction, 1.0 where the edge/corner is raised.
/// Compound directions take the union of their two cardinal patterns.
fn ramp_pattern(dir: RampDir) -> [f32; 4] {
    match dir {
        RampDir::North => [1.0, 1.0, 0.0, 0.0],
        RampDir::South => [0.0, 0.0, 1.0, 1.0],
        RampDir::East => [0.0, 1.0, 0.0, 1.0],
        RampDir::West => [1.0, 0.0, 1.0, 0.0],
        RampDir::NorthEast => [1.0, 1.0, 0.0, 1.0],
        RampDir::NorthWest => [1.0, 1.0, 1.0, 0.0],
        RampDir::SouthEast => [0.0, 1.0, 1.0, 1.0],
        RampDir::SouthWest => [1.0, 0.0, 1.0, 1.0],
    }
}

impl BlockShape {
    pub fn profile(&self) -> ColumnProfile {
        match self {
            BlockShape::Empty => ColumnProfile::EMPTY,
            BlockShape::Solid | BlockShape::Fluid | BlockShape::Invalid => ColumnProfile::FULL,
            BlockShape::LowerHalf => ColumnProfile {
                floor: 0.0,
                tops: [0.5; 4],
            },
            BlockShape::UpperHalf => ColumnProfile {
                floor: 0.5,
                tops: [1.0; 4],
            },
            BlockShape::FullRamp(dir) => ColumnProfile {
                floor: 0.0,
                tops: ramp_pattern(*dir),
            },
            BlockShape::LowerRamp(dir) => {
                let p = ramp_pattern(*dir);
                ColumnProfile {
                    floor: 0.0,
                    tops: [p[0] * 0.5, p[1] * 0.5, p[2] * 0.5, p[3] * 0.5],
                }
            }
            BlockShape::UpperRamp(dir) => {
                let p = ramp_pattern(*dir);
                ColumnProfile {
                    floor: 0.0,
                    tops: [
                        0.5 + p[0] * 0.5,
                        0.5 + p[1] * 0.5,
                        0.5 + p[2] * 0.5,
                        0.5 + p[3] * 0.5,
                    ],
                }
            }
        }
    }

    /// Top height at fractional in-cell coordinates, in `[0, 1]`. Empty
    /// resolves to 0.
    pub fn height_at(&self, fh: f32, fv: f32) -> f32 {
        self.profile().height_at(fh, fv)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BlockShape::Empty)
    }

    pub fn is_fluid(&self) -> bool {
        matches!(self, BlockShape::Fluid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, BlockShape::Invalid)
    }

    /// Whether the fractional in-cell point lies inside the occupied column.
    /// Fluid and the boundary sentinel never collide.
    pub fn occupies(&self, fh: f32, fv: f32, fd: f32) -> bool {
        if self.is_empty() || self.is_fluid() || self.is_invalid() {
            return false;
        }
        let profile = self.profile();
        fd >= profile.floor && fd <= profile.height_at(fh, fv)
    }
}

/// One voxel cell's material and geometric form. Equality is structural; the
/// catalog dedups on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub def_id: u16,
    pub shape: BlockShape,
}

impl Block {
    pub const EMPTY: Block = Block {
        def_id: 0,
        shape: BlockShape::Empty,
    };

    /// Boundary sentinel handed out where no cluster exists. Registering it
    /// in the catalog is a fatal programmer error.
    pub const INVALID: Block = Block {
        def_id: u16::MAX,
        shape: BlockShape::Invalid,
    };

    pub fn new(def_id: u16, shape: BlockShape) -> Self {
        Self { def_id, shape }
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::EMPTY
    }
}
