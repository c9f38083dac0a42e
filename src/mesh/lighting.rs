//! Per-vertex luminance: a single hard shadow term from one directional
//! light, sampled with one occlusion segment per vertex. Deliberately crude;
//! visual parity with the shipped look matters more than softness here.

use glam::Vec3;

/// Luminance applied to vertices the light reaches.
pub const LIT_LUMINANCE: f32 = 1.0;
/// Luminance applied to vertices in shadow.
pub const AMBIENT_LUMINANCE: f32 = 0.55;
/// Vertices on faces turned away from the light keep full luminance; the
/// shading there comes from the normal, not the shadow term.
pub const BACKFACE_LUMINANCE: f32 = 1.0;

/// Offset along the face normal before casting, so the segment does not
/// immediately hit the emitting block itself.
const SURFACE_BIAS: f32 = 0.01;

/// Answers "does anything solid block the straight segment between these two
/// points". The world map implements this over block shapes.
pub trait LightOcclusion {
    fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool;
}

/// Luminance for one emitted vertex. `occlusion` of `None` means the build
/// runs without a world context (tests, previews) and everything is lit.
pub fn vertex_luminance(
    position: Vec3,
    normal: Vec3,
    light_pos: Vec3,
    occlusion: Option<&dyn LightOcclusion>,
) -> f32 {
    let to_light = light_pos - position;
    if normal.dot(to_light) < 0.0 {
        return BACKFACE_LUMINANCE;
    }

    match occlusion {
        Some(world) => {
            let start = position + normal * SURFACE_BIAS;
            if world.segment_blocked(start, light_pos) {
                AMBIENT_LUMINANCE
            } else {
                LIT_LUMINANCE
            }
        }
        None => LIT_LUMINANCE,
    }
}
