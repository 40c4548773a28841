pub mod shadow;
pub mod unified;
pub mod water;

use crate::batch::RectSet;
use crate::config::TileConfig;
use crate::material::MaterialSpec;

pub use shadow::ShadowGeometry;
pub use unified::TileGeometry;
pub use water::WaterGeometry;

/// Normal shared by every tile vertex; tiles always face the camera.
pub const FACING_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

// ── Attribute ─────────────────────────────────────────────────────────────────

/// One vertex attribute stream plus a flag telling the GPU side to re-upload it.
///
/// Rewriting keeps the allocation, so a frame with the same vertex count as
/// the previous one does not touch the allocator.
#[derive(Clone, Debug)]
pub struct Attribute<T> {
    data: Vec<T>,
    dirty: bool,
}

impl<T> Default for Attribute<T> {
    fn default() -> Self {
        Self { data: Vec::new(), dirty: false }
    }
}

impl<T: Copy> Attribute<T> {
    /// Empty the stream for rewriting and flag it for upload.
    pub fn rewrite(&mut self) -> &mut Vec<T> {
        self.data.clear();
        self.dirty = true;
        &mut self.data
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and reset the upload flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

// ── MeshRecord ────────────────────────────────────────────────────────────────

/// A lazily created mesh: its geometry, visibility and current material.
///
/// Records are never destroyed while the layer lives; an empty stream only
/// hides its record.
#[derive(Debug, Default)]
pub struct MeshRecord<G> {
    pub geometry: G,
    pub visible: bool,
    material: Option<MaterialSpec>,
    material_generation: u64,
}

impl<G> MeshRecord<G> {
    pub fn material(&self) -> Option<&MaterialSpec> {
        self.material.as_ref()
    }

    /// Bumped every time the material is released and rebuilt.
    pub fn material_generation(&self) -> u64 {
        self.material_generation
    }

    /// Install `spec`, replacing the previous material if it differs.
    /// Returns `true` when a rebuild happened.
    pub fn sync_material(&mut self, spec: MaterialSpec) -> bool {
        if self.material == Some(spec) {
            return false;
        }
        if let Some(old) = self.material.take() {
            log::info!("material rebuilt: {:?} -> {:?}", old.variant, spec.variant);
        }
        self.material = Some(spec);
        self.material_generation += 1;
        true
    }
}

// ── Shared geometry helpers ──────────────────────────────────────────────────

/// Push the six positions of rect `index`, offset along Z by its draw layer.
pub(crate) fn push_quad_positions(out: &mut Vec<[f32; 3]>, set: &RectSet, index: usize, cfg: &TileConfig) {
    let z = cfg.elevation_z(set.meta(index).draw_z);
    out.extend(set.quad_positions(index).chunks_exact(2).map(|p| [p[0], p[1], z]));
}

pub(crate) fn push_normals(out: &mut Vec<[f32; 3]>, count: usize) {
    out.extend(std::iter::repeat_n(FACING_NORMAL, count));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{MaterialVariant, RenderContext};

    #[test]
    fn rewrite_flags_attribute_dirty_once() {
        let mut a: Attribute<u32> = Attribute::default();
        a.rewrite().push(7);
        assert!(a.take_dirty());
        assert!(!a.take_dirty());
        assert_eq!(a.as_slice(), &[7]);
    }

    #[test]
    fn identical_material_is_not_rebuilt() {
        let cfg = TileConfig::default();
        let spec = MaterialSpec::tiles(&cfg, RenderContext::default(), MaterialVariant::Unlit, 0);
        let mut rec: MeshRecord<()> = MeshRecord::default();
        assert!(rec.sync_material(spec));
        assert!(!rec.sync_material(spec));
        assert_eq!(rec.material_generation(), 1);

        let lit = MaterialSpec::tiles(&cfg, RenderContext::default(), MaterialVariant::Lit, 0);
        assert!(rec.sync_material(lit));
        assert_eq!(rec.material_generation(), 2);
        assert_eq!(rec.material().map(|m| m.variant), Some(MaterialVariant::Lit));
    }
}
