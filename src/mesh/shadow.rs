use crate::batch::RectSet;
use crate::config::TileConfig;

use super::{push_normals, push_quad_positions, Attribute};

/// Flat-colour batch of every shadow rect.  Carries no UVs.
#[derive(Debug, Default)]
pub struct ShadowGeometry {
    pub positions: Attribute<[f32; 3]>,
    pub normals: Attribute<[f32; 3]>,
}

impl ShadowGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

pub fn build(set: &RectSet, cfg: &TileConfig, geom: &mut ShadowGeometry) {
    let positions = geom.positions.rewrite();
    for index in 0..set.len() {
        push_quad_positions(positions, set, index, cfg);
    }
    let count = positions.len();
    push_normals(geom.normals.rewrite(), count);
}
