//! Face-culling rules: given a block shape, its neighbor's shape and the
//! face direction, decide whether the face is visible.
//!
//! Two strategies exist behind one trait: a coarse binary table that only
//! treats full solids as occluders, and a richer directional table that
//! compares boundary profiles so matching ramps and half blocks seal their
//! shared faces. Pick one per deployment; they are not meant to be mixed.

use crate::world::block::BlockShape;

const EPS: f32 = 1e-4;

/// The 6 face directions of a cell. North is -v, South +v, East +h, West -h,
/// Up +d, Down -d.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceDir {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl FaceDir {
    pub const ALL: [FaceDir; 6] = [
        FaceDir::Up,
        FaceDir::Down,
        FaceDir::North,
        FaceDir::South,
        FaceDir::East,
        FaceDir::West,
    ];

    /// Neighbor cell offset in (dh, dv, dd).
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            FaceDir::Up => (0, 0, 1),
            FaceDir::Down => (0, 0, -1),
            FaceDir::North => (0, -1, 0),
            FaceDir::South => (0, 1, 0),
            FaceDir::East => (1, 0, 0),
            FaceDir::West => (-1, 0, 0),
        }
    }

    /// Cardinal side-texture slot (North, South, East, West); vertical faces
    /// have none.
    pub fn side_slot(&self) -> Option<usize> {
        match self {
            FaceDir::North => Some(0),
            FaceDir::South => Some(1),
            FaceDir::East => Some(2),
            FaceDir::West => Some(3),
            _ => None,
        }
    }
}

/// Decides whether a face between `block` and `neighbor` should be emitted.
pub trait CullingStrategy: Send + Sync {
    fn face_open(&self, block: BlockShape, neighbor: BlockShape, dir: FaceDir) -> bool;
}

/// Rules shared by both strategies: empty/invalid blocks have no faces, an
/// unloaded boundary never exposes one, and fluid never self-occludes into
/// a visible shared face.
fn common_rule(block: BlockShape, neighbor: BlockShape) -> Option<bool> {
    if block.is_empty() || block.is_invalid() {
        return Some(false);
    }
    if neighbor.is_invalid() {
        return Some(false);
    }
    if neighbor.is_empty() {
        return Some(true);
    }
    if block.is_fluid() && neighbor.is_fluid() {
        return Some(false);
    }
    // Fluid neighbors never hide a solid face; the surface must stay
    // visible through the transparent material.
    if neighbor.is_fluid() {
        return Some(true);
    }
    None
}

/// Coarse table: only a full `Solid` neighbor occludes. Halves and ramps
/// always leave the shared face open, which overdraws but never leaves a
/// hole.
pub struct BinaryCulling;

impl CullingStrategy for BinaryCulling {
    fn face_open(&self, block: BlockShape, neighbor: BlockShape, _dir: FaceDir) -> bool {
        match common_rule(block, neighbor) {
            Some(open) => open,
            None => !matches!(neighbor, BlockShape::Solid),
        }
    }
}

/// Richer table: compares the two shapes' profiles on the shared boundary.
/// A face is closed when the neighbor is at least as thick everywhere along
/// the boundary, so identical ramps with matching orientation seal their
/// seam while mismatched slopes stay open.
pub struct DirectionalCulling;

/// Corner tops on the edge of a cell facing `dir`, ordered by the axis that
/// runs along the edge.
fn edge_tops(shape: BlockShape, dir: FaceDir) -> [f32; 2] {
    let tops = shape.profile().tops; // c00, c10, c01, c11
    match dir {
        FaceDir::North => [tops[0], tops[1]],
        FaceDir::South => [tops[2], tops[3]],
        FaceDir::East => [tops[1], tops[3]],
        FaceDir::West => [tops[0], tops[2]],
        FaceDir::Up | FaceDir::Down => unreachable!("edge_tops is for horizontal faces"),
    }
}

fn opposite(dir: FaceDir) -> FaceDir {
    match dir {
        FaceDir::Up => FaceDir::Down,
        FaceDir::Down => FaceDir::Up,
        FaceDir::North => FaceDir::South,
        FaceDir::South => FaceDir::North,
        FaceDir::East => FaceDir::West,
        FaceDir::West => FaceDir::East,
    }
}

impl CullingStrategy for DirectionalCulling {
    fn face_open(&self, block: BlockShape, neighbor: BlockShape, dir: FaceDir) -> bool {
        if block.is_empty() || block.is_invalid() {
            return false;
        }

        let block_profile = block.profile();

        // Zero-thickness boundary (e.g. a ramp's low edge): no face to emit
        // toward this side regardless of the neighbor.
        if !matches!(dir, FaceDir::Up | FaceDir::Down) {
            let ours = edge_tops(block, dir);
            if ours.iter().all(|&t| t <= block_profile.floor + EPS) {
                return false;
            }
        }

        if let Some(open) = common_rule(block, neighbor) {
            return open;
        }

        let neighbor_profile = neighbor.profile();

        match dir {
            FaceDir::Up => {
                // The top face sits at the shared plane only when this block
                // is full height; a lower top is interior and always open.
                if block_profile.tops.iter().any(|&t| t < 1.0 - EPS) {
                    return true;
                }
                neighbor_profile.floor > EPS
                    || neighbor_profile.tops.iter().any(|&t| t <= EPS)
            }
            FaceDir::Down => {
                if block_profile.floor > EPS {
                    return true;
                }
                neighbor_profile.tops.iter().any(|&t| t < 1.0 - EPS)
            }
            _ => {
                let ours = edge_tops(block, dir);
                let theirs = edge_tops(neighbor, opposite(dir));
                let covered = neighbor_profile.floor <= block_profile.floor + EPS
                    && theirs[0] >= ours[0] - EPS
                    && theirs[1] >= ours[1] - EPS;
                !covered
            }
        }
    }
}
