// ── Unified tile batch ────────────────────────────────────────────────────────
//
// Every non-water, non-shadow rect of every tileset ends up in this single
// mesh.  The per-vertex `layer` attribute selects the array-texture slice,
// so one draw call covers all nine tilesets.

use crate::batch::{RectAccumulator, RectMeta, VERTS_PER_RECT};
use crate::classify::UnifiedRect;
use crate::config::TileConfig;

use super::{push_normals, push_quad_positions, Attribute};

#[derive(Debug, Default)]
pub struct TileGeometry {
    pub positions: Attribute<[f32; 3]>,
    pub normals: Attribute<[f32; 3]>,
    /// Normalised array-layer UVs, top-left origin.
    pub uvs: Attribute<[f32; 2]>,
    /// Array-texture slice per vertex.
    pub layers: Attribute<u32>,
    /// Highest draw z among the batched rects.
    pub max_draw_z: u8,
}

impl TileGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Array-layer UV of one vertex.  Shared by the full rebuild and the UV-only
/// patch so both produce identical bits.
#[inline]
pub fn tile_uv(u: f32, v: f32, meta: &RectMeta, phase: [f32; 2], layer_size: f32) -> [f32; 2] {
    [
        (u + meta.anim_x * phase[0]) / layer_size,
        (v + meta.anim_y * phase[1]) / layer_size,
    ]
}

/// Rebuild all attributes of the unified batch from the sorted rect list.
pub fn build(
    rects: &RectAccumulator,
    sorted: &[UnifiedRect],
    cfg: &TileConfig,
    phase: [f32; 2],
    geom: &mut TileGeometry,
) {
    let positions = geom.positions.rewrite();
    let layers = geom.layers.rewrite();
    let mut max_draw_z = 0;

    for r in sorted {
        let Some(set) = rects.set(r.set_number) else { continue };
        push_quad_positions(positions, set, r.index, cfg);
        let layer = r.set_number.max(0) as u32;
        layers.extend(std::iter::repeat_n(layer, VERTS_PER_RECT));
        max_draw_z = max_draw_z.max(r.draw_z);
    }

    let count = positions.len();
    push_normals(geom.normals.rewrite(), count);
    geom.max_draw_z = max_draw_z;
    patch_uvs(rects, sorted, cfg, phase, geom);
}

/// Recompute only the UV attribute for a new animation phase.
pub fn patch_uvs(
    rects: &RectAccumulator,
    sorted: &[UnifiedRect],
    cfg: &TileConfig,
    phase: [f32; 2],
    geom: &mut TileGeometry,
) {
    let size = cfg.layer_size as f32;
    let uvs = geom.uvs.rewrite();
    for r in sorted {
        let Some(set) = rects.set(r.set_number) else { continue };
        let meta = set.meta(r.index);
        uvs.extend(
            set.quad_uvs(r.index)
                .chunks_exact(2)
                .map(|uv| tile_uv(uv[0], uv[1], &meta, phase, size)),
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
