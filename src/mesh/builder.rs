//! Converts one cluster's block grid into per-texture triangle buffers.
//!
//! The build is a pure function of the cluster, its 4 horizontal neighbors
//! and the catalog/definition registries: building twice from the same
//! snapshot yields identical buffers. Missing neighbors resolve to the
//! invalid boundary sentinel so no faces are emitted toward unloaded space
//! (a seam would appear once the neighbor streams in otherwise).

use crate::mesh::culling::{CullingStrategy, FaceDir};
use crate::mesh::geometry::{ClusterGeometry, Face, MeshGroup};
use crate::mesh::lighting::{vertex_luminance, LightOcclusion};
use crate::world::block::{Block, BlockShape, ColumnProfile};
use crate::world::block_def::{BlockDef, BlockDefRegistry, TextureId};
use crate::world::catalog::BlockCatalog;
use crate::world::cluster::Cluster;
use glam::{Vec2, Vec3};
use std::collections::HashMap;
use std::sync::Arc;

const EPS: f32 = 1e-4;

/// Read-only neighbor snapshot captured at dispatch time.
#[derive(Clone, Default)]
pub struct NeighborClusters {
    pub north: Option<Arc<Cluster>>,
    pub south: Option<Arc<Cluster>>,
    pub east: Option<Arc<Cluster>>,
    pub west: Option<Arc<Cluster>>,
}

impl NeighborClusters {
    pub fn none() -> Self {
        Self::default()
    }

    fn for_dir(&self, dir: FaceDir) -> Option<&Arc<Cluster>> {
        match dir {
            FaceDir::North => self.north.as_ref(),
            FaceDir::South => self.south.as_ref(),
            FaceDir::East => self.east.as_ref(),
            FaceDir::West => self.west.as_ref(),
            FaceDir::Up | FaceDir::Down => None,
        }
    }
}

/// Everything a build needs besides the cluster itself.
pub struct MeshContext<'a> {
    pub catalog: &'a BlockCatalog,
    pub defs: &'a BlockDefRegistry,
    pub culling: &'a dyn CullingStrategy,
    pub light_pos: Vec3,
    pub occlusion: Option<&'a dyn LightOcclusion>,
}

/// Builds renderable geometry for `cluster`. Blocks whose definition id is
/// unknown are skipped as if empty; this must never fail.
pub fn build_cluster_geometry(
    cluster: &Cluster,
    neighbors: &NeighborClusters,
    ctx: &MeshContext<'_>,
) -> ClusterGeometry {
    let hv = cluster.hv_size();
    let depth = cluster.d_size();
    let indices = cluster.snapshot_indices();
    let origin = cluster.origin();

    let mut builder = GroupedFaces::default();

    for d in 0..depth {
        for v in 0..hv {
            for h in 0..hv {
                let index = indices[(d * hv * hv + v * hv + h) as usize];
                if index == 0 {
                    continue;
                }
                let block = ctx.catalog.get(index);
                if block.is_empty() {
                    continue;
                }
                let def = match ctx.defs.get(block.def_id) {
                    Some(def) => def,
                    // Out-of-range definition: treated as empty, not an error.
                    None => continue,
                };
                let profile = block.shape.profile();
                if profile.is_vacant() {
                    continue;
                }

                let base = Vec3::new(
                    (origin.h + h as i32) as f32,
                    d as f32,
                    (origin.v + v as i32) as f32,
                );

                for dir in FaceDir::ALL {
                    let neighbor =
                        sample_neighbor(cluster, neighbors, ctx, &indices, h, v, d, dir);
                    if ctx.culling.face_open(block.shape, neighbor, dir) {
                        emit_face(&mut builder, ctx, &def, block.shape, &profile, base, dir);
                    }
                }
            }
        }
    }

    builder.finalize(cluster)
}

/// Shape of the cell adjacent to `(h, v, d)` in `dir`. Vertical neighbors
/// outside the cluster are open sky / open underside; horizontal ones come
/// from the neighbor snapshot or resolve to the invalid sentinel when the
/// cluster is not loaded.
fn sample_neighbor(
    cluster: &Cluster,
    neighbors: &NeighborClusters,
    ctx: &MeshContext<'_>,
    indices: &[u16],
    h: u32,
    v: u32,
    d: u32,
    dir: FaceDir,
) -> BlockShape {
    let hv = cluster.hv_size() as i32;
    let depth = cluster.d_size() as i32;
    let (dh, dv, dd) = dir.offset();
    let (nh, nv, nd) = (h as i32 + dh, v as i32 + dv, d as i32 + dd);

    if nd < 0 || nd >= depth {
        return BlockShape::Empty;
    }

    let block = if nh >= 0 && nh < hv && nv >= 0 && nv < hv {
        let index = indices[(nd as u32 * cluster.hv_size() * cluster.hv_size()
            + nv as u32 * cluster.hv_size()
            + nh as u32) as usize];
        ctx.catalog.get(index)
    } else {
        match neighbors.for_dir(dir) {
            Some(neighbor) => neighbor.get_block_relative(
                nh.rem_euclid(hv) as u32,
                nv.rem_euclid(hv) as u32,
                nd as u32,
            ),
            None => Block::INVALID,
        }
    };

    // A neighbor with an unknown definition meshes as empty, so it cannot
    // occlude either.
    if !block.is_empty()
        && !block.shape.is_invalid()
        && ctx.defs.get(block.def_id).is_none()
    {
        return BlockShape::Empty;
    }
    block.shape
}

#[derive(Default)]
struct GroupedFaces {
    opaque: HashMap<TextureId, MeshGroup>,
    transparent: HashMap<TextureId, MeshGroup>,
}

impl GroupedFaces {
    fn group(&mut self, texture: TextureId, transparent: bool) -> &mut MeshGroup {
        let groups = if transparent {
            &mut self.transparent
        } else {
            &mut self.opaque
        };
        groups
            .entry(texture)
            .or_insert_with(|| MeshGroup::new(texture))
    }

    fn finalize(self, cluster: &Cluster) -> ClusterGeometry {
        let mut geometry = ClusterGeometry::empty(cluster.bounds());
        for (texture, group) in &self.opaque {
            geometry.opaque.insert(*texture, group.finalize());
        }
        for (texture, group) in &self.transparent {
            geometry.transparent.insert(*texture, group.finalize());
        }
        geometry
    }
}

fn emit_face(
    builder: &mut GroupedFaces,
    ctx: &MeshContext<'_>,
    def: &BlockDef,
    shape: BlockShape,
    profile: &ColumnProfile,
    base: Vec3,
    dir: FaceDir,
) {
    let texture = match dir {
        FaceDir::Up => def.top_texture,
        FaceDir::Down => def.bottom_texture,
        _ => def.side_texture(dir.side_slot().unwrap_or(0)),
    };
    let transparent = def.transparent || shape.is_fluid();
    let group = builder.group(texture, transparent);

    match dir {
        FaceDir::Up => emit_top(group, ctx, profile, base),
        FaceDir::Down => emit_bottom(group, ctx, profile, base),
        _ => emit_side(group, ctx, profile, base, dir),
    }
}

/// Corner position within the cell at (fh, fv) and height `t`.
fn corner(base: Vec3, fh: f32, fv: f32, t: f32) -> Vec3 {
    base + Vec3::new(fh, t, fv)
}

fn push_face(group: &mut MeshGroup, ctx: &MeshContext<'_>, vertices: Vec<Vec3>, uvs: Vec<Vec2>) {
    let normal = (vertices[1] - vertices[0])
        .cross(vertices[2] - vertices[0])
        .normalize();
    let luminance = vertices
        .iter()
        .map(|pos| vertex_luminance(*pos, normal, ctx.light_pos, ctx.occlusion))
        .collect();
    group.add_face(Face::new(vertices, normal, uvs, luminance));
}

/// Top surface over the 4 corner heights. Planar tops are one quad; corner
/// ramps split along the diagonal whose endpoints are level, so the two
/// triangles share a seam on the ridge (or valley).
fn emit_top(group: &mut MeshGroup, ctx: &MeshContext<'_>, profile: &ColumnProfile, base: Vec3) {
    let [t00, t10, t01, t11] = profile.tops;
    let c00 = corner(base, 0.0, 0.0, t00);
    let c10 = corner(base, 1.0, 0.0, t10);
    let c01 = corner(base, 0.0, 1.0, t01);
    let c11 = corner(base, 1.0, 1.0, t11);

    let uv00 = Vec2::new(0.0, 0.0);
    let uv10 = Vec2::new(1.0, 0.0);
    let uv01 = Vec2::new(0.0, 1.0);
    let uv11 = Vec2::new(1.0, 1.0);

    if profile.top_is_planar() {
        push_face(
            group,
            ctx,
            vec![c00, c01, c11, c10],
            vec![uv00, uv01, uv11, uv10],
        );
    } else if (t00 - t11).abs() <= (t10 - t01).abs() {
        // Seam through c00-c11.
        push_face(group, ctx, vec![c00, c01, c11], vec![uv00, uv01, uv11]);
        push_face(group, ctx, vec![c00, c11, c10], vec![uv00, uv11, uv10]);
    } else {
        // Seam through c10-c01.
        push_face(group, ctx, vec![c00, c01, c10], vec![uv00, uv01, uv10]);
        push_face(group, ctx, vec![c10, c01, c11], vec![uv10, uv01, uv11]);
    }
}

fn emit_bottom(group: &mut MeshGroup, ctx: &MeshContext<'_>, profile: &ColumnProfile, base: Vec3) {
    let f = profile.floor;
    push_face(
        group,
        ctx,
        vec![
            corner(base, 0.0, 0.0, f),
            corner(base, 1.0, 0.0, f),
            corner(base, 1.0, 1.0, f),
            corner(base, 0.0, 1.0, f),
        ],
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    );
}

/// Side wall between the floor and the two corner tops on the edge facing
/// `dir`. Ramps degrade the quad to a triangle where one corner meets the
/// floor; the UV v-coordinate is the height fraction, so sloped faces get
/// slope-proportional texturing.
fn emit_side(
    group: &mut MeshGroup,
    ctx: &MeshContext<'_>,
    profile: &ColumnProfile,
    base: Vec3,
    dir: FaceDir,
) {
    let [t00, t10, t01, t11] = profile.tops;
    let f = profile.floor;

    // (corner a, corner b) with (fh, fv, top) each, ordered so the quad
    // [b_floor, a_floor, a_top, b_top] winds outward.
    let (a, b) = match dir {
        FaceDir::East => ((1.0, 0.0, t10), (1.0, 1.0, t11)),
        FaceDir::West => ((0.0, 1.0, t01), (0.0, 0.0, t00)),
        FaceDir::South => ((1.0, 1.0, t11), (0.0, 1.0, t01)),
        FaceDir::North => ((0.0, 0.0, t00), (1.0, 0.0, t10)),
        FaceDir::Up | FaceDir::Down => unreachable!("emit_side is for horizontal faces"),
    };

    let (ah, av, at) = a;
    let (bh, bv, bt) = b;
    if at <= f + EPS && bt <= f + EPS {
        return;
    }

    let a_floor = corner(base, ah, av, f);
    let b_floor = corner(base, bh, bv, f);
    let a_top = corner(base, ah, av, at);
    let b_top = corner(base, bh, bv, bt);

    if bt <= f + EPS {
        push_face(
            group,
            ctx,
            vec![b_floor, a_floor, a_top],
            vec![Vec2::new(0.0, f), Vec2::new(1.0, f), Vec2::new(1.0, at)],
        );
    } else if at <= f + EPS {
        push_face(
            group,
            ctx,
            vec![b_floor, a_floor, b_top],
            vec![Vec2::new(0.0, f), Vec2::new(1.0, f), Vec2::new(0.0, bt)],
        );
    } else {
        push_face(
            group,
            ctx,
            vec![b_floor, a_floor, a_top, b_top],
            vec![
                Vec2::new(0.0, f),
                Vec2::new(1.0, f),
                Vec2::new(1.0, at),
                Vec2::new(0.0, bt),
            ],
        );
    }
}
