// ── Water groups ──────────────────────────────────────────────────────────────
//
// Water rects are drawn from their tileset's own full-resolution texture,
// one small mesh per (tileset, waterfall, kind).  UVs live in that texture's
// native space with a bottom-left origin, and each quad carries its UV box
// shrunk by half a texel so the distortion stage can clamp to the tile's
// own footprint.

use crate::batch::{RectAccumulator, RectMeta, VERTS_PER_RECT};
use crate::bitmap::Revision;
use crate::config::TileConfig;
use crate::water::WaterUniforms;

use super::{push_normals, push_quad_positions, Attribute};

#[derive(Debug, Default)]
pub struct WaterGeometry {
    pub positions: Attribute<[f32; 3]>,
    pub normals: Attribute<[f32; 3]>,
    /// Normalised source-texture UVs, bottom-left origin.
    pub uvs: Attribute<[f32; 2]>,
    /// `[min_u, min_v, max_u, max_v]` of the owning quad, inset by half a texel.
    pub bounds: Attribute<[f32; 4]>,
    /// Pixel size of the bound source texture.
    pub texture_size: (u32, u32),
    /// Source bitmap the geometry was built against.
    pub texture_revision: Revision,
    pub uniforms: WaterUniforms,
    /// `uniforms` changed since the last upload.
    pub uniforms_dirty: bool,
}

impl WaterGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Source-texture UV of one vertex, flipped to a bottom-left origin.
#[inline]
pub fn water_uv(u: f32, v: f32, meta: &RectMeta, phase: [f32; 2], size: (u32, u32)) -> [f32; 2] {
    let (w, h) = (size.0 as f32, size.1 as f32);
    [
        (u + meta.anim_x * phase[0]) / w,
        1.0 - (v + meta.anim_y * phase[1]) / h,
    ]
}

/// Bounding box of a quad's UVs shrunk by half a texel on each edge.
pub fn inset_bounds(quad: &[[f32; 2]], size: (u32, u32)) -> [f32; 4] {
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for uv in quad {
        min[0] = min[0].min(uv[0]);
        min[1] = min[1].min(uv[1]);
        max[0] = max[0].max(uv[0]);
        max[1] = max[1].max(uv[1]);
    }
    let half_u = 0.5 / size.0 as f32;
    let half_v = 0.5 / size.1 as f32;
    [min[0] + half_u, min[1] + half_v, max[0] - half_u, max[1] - half_v]
}

/// Rebuild every attribute of one water group.
pub fn build(
    rects: &RectAccumulator,
    set_number: i32,
    indices: &[usize],
    cfg: &TileConfig,
    phase: [f32; 2],
    geom: &mut WaterGeometry,
) {
    let positions = geom.positions.rewrite();
    if let Some(set) = rects.set(set_number) {
        for &index in indices {
            push_quad_positions(positions, set, index, cfg);
        }
    }
    let count = positions.len();
    push_normals(geom.normals.rewrite(), count);
    patch_uvs(rects, set_number, indices, phase, geom);
}

/// Recompute UVs and UV bounds for a new animation phase.
pub fn patch_uvs(
    rects: &RectAccumulator,
    set_number: i32,
    indices: &[usize],
    phase: [f32; 2],
    geom: &mut WaterGeometry,
) {
    let size = geom.texture_size;
    let uvs = geom.uvs.rewrite();
    let bounds = geom.bounds.rewrite();
    let Some(set) = rects.set(set_number) else { return };

    for &index in indices {
        let meta = set.meta(index);
        let start = uvs.len();
        uvs.extend(
            set.quad_uvs(index)
                .chunks_exact(2)
                .map(|uv| water_uv(uv[0], uv[1], &meta, phase, size)),
        );
        let quad_bounds = inset_bounds(&uvs[start..], size);
        bounds.extend(std::iter::repeat_n(quad_bounds, VERTS_PER_RECT));
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_uv_is_flipped() {
        let meta = RectMeta { anim_x: 0.0, anim_y: 0.0, kind: 0, draw_z: 0 };
        assert_eq!(water_uv(0.0, 0.0, &meta, [0.0, 0.0], (256, 128)), [0.0, 1.0]);
        assert_eq!(water_uv(64.0, 32.0, &meta, [0.0, 0.0], (256, 128)), [0.25, 0.75]);
    }

    #[test]
    fn bounds_inset_by_half_texel() {
        let quad = [[0.25, 0.5], [0.5, 0.5], [0.25, 0.25], [0.5, 0.5], [0.5, 0.25], [0.25, 0.25]];
        let b = inset_bounds(&quad, (100, 200));
        assert_eq!(b, [0.25 + 0.005, 0.25 + 0.0025, 0.5 - 0.005, 0.5 - 0.0025]);
    }
}
