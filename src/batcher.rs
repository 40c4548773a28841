// =============================================================================
// BATCHER.RS: GPU-free core of a tile layer
//
// Accumulates tile draw commands and turns them into mesh geometry:
// - `flush` after a structural change (add_rect / clear / set_bitmaps /
//   config change) classifies every rect and rebuilds all meshes;
// - `flush` after only an animation-phase change patches UV attributes of
//   the already built meshes;
// - `flush` with nothing changed does nothing.
// Every attribute that changes is flagged so the GPU side uploads only that.
// =============================================================================

use std::collections::BTreeMap;

use crate::batch::{RectAccumulator, RectParams, SHADOW_SET};
use crate::bitmap::Bitmap;
use crate::classify::{classify, Classification, WaterKey};
use crate::config::{RenderMode, TileConfig};
use crate::material::{MaterialSpec, MaterialVariant, RenderContext};
use crate::mesh::{self, MeshRecord, ShadowGeometry, TileGeometry, WaterGeometry};
use crate::shadow::ShadowSwitch;
use crate::texture_array::LayerTracker;
use crate::water::WaterClassifier;

/// Whether geometry must be rebuilt on the next flush.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayerState {
    Idle,
    /// A structural mutation happened since the last rebuild.
    Dirty,
}

/// What a flush did to the geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Full classification and rebuild.
    Rebuilt,
    /// Only UV (and water UV-bound) attributes were recomputed.
    UvPatched,
    Unchanged,
}

pub struct TileBatcher {
    cfg: TileConfig,
    ctx: RenderContext,
    water: Box<dyn WaterClassifier>,
    shadows: ShadowSwitch,

    rects: RectAccumulator,
    bitmaps: Vec<Bitmap>,
    layers: LayerTracker,
    classification: Classification,

    unified: Option<MeshRecord<TileGeometry>>,
    shadow: Option<MeshRecord<ShadowGeometry>>,
    water_meshes: BTreeMap<WaterKey, MeshRecord<WaterGeometry>>,

    state: LayerState,
    phase: [f32; 2],
    built_phase: [f32; 2],
    /// A water group was skipped on the last rebuild for lack of a texture.
    water_skipped: bool,
    shadow_color: [f32; 4],
    shadow_color_dirty: bool,
}

impl TileBatcher {
    pub fn new(cfg: TileConfig, water: Box<dyn WaterClassifier>, shadows: ShadowSwitch) -> Self {
        Self {
            rects: RectAccumulator::new(cfg.initial_capacity),
            layers: LayerTracker::new(cfg.layer_size, cfg.layer_count),
            shadow_color: cfg.shadow_color,
            shadow_color_dirty: true,
            cfg,
            ctx: RenderContext::default(),
            water,
            shadows,
            bitmaps: Vec::new(),
            classification: Classification::default(),
            unified: None,
            shadow: None,
            water_meshes: BTreeMap::new(),
            state: LayerState::Dirty,
            phase: [0.0, 0.0],
            built_phase: [0.0, 0.0],
            water_skipped: false,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Bind up to `layer_count` tileset sources.  Drops every cached layer.
    pub fn set_bitmaps(&mut self, bitmaps: &[Bitmap]) {
        if bitmaps.len() > self.cfg.layer_count as usize {
            log::warn!(
                "set_bitmaps: {} bitmaps bound but only {} layers exist; extras are ignored",
                bitmaps.len(),
                self.cfg.layer_count
            );
        }
        self.bitmaps = bitmaps.to_vec();
        self.layers.invalidate();
        self.state = LayerState::Dirty;
    }

    /// Discard all accumulated rects.
    pub fn clear(&mut self) {
        self.rects.clear();
        self.state = LayerState::Dirty;
    }

    /// Append a static quad.  `set_number` is -1 for shadow or 0..=8 for a
    /// tileset layer.
    #[allow(clippy::too_many_arguments)]
    pub fn add_rect(&mut self, set_number: i32, u: f32, v: f32, x: f32, y: f32, w: f32, h: f32) {
        self.add_rect_with(set_number, RectParams::new(u, v, x, y, w, h));
    }

    pub fn add_rect_with(&mut self, set_number: i32, params: RectParams) {
        self.rects.add(set_number, params);
        self.state = LayerState::Dirty;
    }

    /// Paint layer (0..=3) for subsequent rects.
    pub fn set_draw_z(&mut self, z: u8) {
        self.rects.set_draw_z(z);
    }

    /// Global animation phase multiplied into every rect's `anim_x/anim_y`.
    pub fn set_animation_offset(&mut self, x: f32, y: f32) {
        self.phase = [x, y];
    }

    pub fn set_shadow_color(&mut self, rgba: [f32; 4]) {
        if self.shadow_color != rgba {
            self.shadow_color = rgba;
            self.shadow_color_dirty = true;
        }
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if self.cfg.mode != mode {
            self.cfg.mode = mode;
            self.state = LayerState::Dirty;
        }
    }

    pub fn set_elevation(&mut self, enabled: bool) {
        if self.cfg.elevation != enabled {
            self.cfg.elevation = enabled;
            self.state = LayerState::Dirty;
        }
    }

    /// Position of this layer in the caller's stack; affects materials only.
    pub fn set_context(&mut self, ctx: RenderContext) {
        self.ctx = ctx;
    }

    /// Advance the water materials' clocks.
    pub fn update_time(&mut self, seconds: f32) {
        for rec in self.water_meshes.values_mut() {
            self.water.advance_time(&mut rec.geometry.uniforms, seconds);
            rec.geometry.uniforms_dirty = true;
        }
    }

    // ── Flush ────────────────────────────────────────────────────────────────

    /// Commit the accumulated rects into mesh geometry for this frame.
    pub fn flush(&mut self) -> FlushOutcome {
        let copied = self.layers.scan(&self.bitmaps);
        if (copied > 0 && self.water_skipped) || self.water_textures_changed() {
            self.state = LayerState::Dirty;
        }

        let outcome = if self.state == LayerState::Dirty {
            self.rebuild();
            self.state = LayerState::Idle;
            FlushOutcome::Rebuilt
        } else if self.phase != self.built_phase {
            self.patch_uvs();
            FlushOutcome::UvPatched
        } else {
            FlushOutcome::Unchanged
        };

        self.sync_materials();
        outcome
    }

    fn water_textures_changed(&self) -> bool {
        self.water_meshes.iter().any(|(key, rec)| {
            rec.visible
                && self
                    .bitmap(key.set_number)
                    .is_some_and(|b| b.revision() != rec.geometry.texture_revision)
        })
    }

    fn bitmap(&self, set_number: i32) -> Option<&Bitmap> {
        usize::try_from(set_number).ok().and_then(|i| self.bitmaps.get(i))
    }

    fn rebuild(&mut self) {
        classify(&self.rects, self.water.as_ref(), &mut self.classification);
        let phase = self.phase;

        // Unified batch.
        if self.classification.unified.is_empty() {
            if let Some(rec) = self.unified.as_mut() {
                rec.visible = false;
            }
        } else {
            let rec = self.unified.get_or_insert_with(MeshRecord::default);
            mesh::unified::build(&self.rects, &self.classification.unified, &self.cfg, phase, &mut rec.geometry);
            rec.visible = true;
        }

        // Shadow batch.
        match self.rects.set(SHADOW_SET).filter(|s| !s.is_empty()) {
            Some(set) => {
                let rec = self.shadow.get_or_insert_with(MeshRecord::default);
                mesh::shadow::build(set, &self.cfg, &mut rec.geometry);
                rec.visible = true;
            }
            None => {
                if let Some(rec) = self.shadow.as_mut() {
                    rec.visible = false;
                }
            }
        }

        // Water groups.
        for rec in self.water_meshes.values_mut() {
            rec.visible = false;
        }
        self.water_skipped = false;
        for (&key, indices) in self.classification.water_groups() {
            let Some(bitmap) = usize::try_from(key.set_number).ok().and_then(|i| self.bitmaps.get(i)) else {
                self.water_skipped = true;
                continue;
            };
            let Some(size) = bitmap.dimensions() else {
                self.water_skipped = true;
                continue;
            };

            let rec = self.water_meshes.entry(key).or_default();
            let geom = &mut rec.geometry;
            let time = geom.uniforms.time;
            geom.texture_size = size;
            geom.texture_revision = bitmap.revision();
            geom.uniforms = self.water.uniforms_for_kind(key.kind);
            geom.uniforms.time = time;
            geom.uniforms.flow = if key.waterfall { 1.0 } else { 0.0 };
            geom.uniforms_dirty = true;
            mesh::water::build(&self.rects, key.set_number, indices, &self.cfg, phase, geom);
            rec.visible = true;
        }

        self.built_phase = phase;
        log::debug!(
            "tile rebuild: {} unified, {} water in {} group(s), {} shadow",
            self.classification.unified.len(),
            self.classification.water_rect_count(),
            self.classification.water_group_count(),
            self.classification.shadow_rects,
        );
    }

    fn patch_uvs(&mut self) {
        let phase = self.phase;
        if let Some(rec) = self.unified.as_mut().filter(|r| r.visible) {
            mesh::unified::patch_uvs(&self.rects, &self.classification.unified, &self.cfg, phase, &mut rec.geometry);
        }
        for (key, rec) in self.water_meshes.iter_mut().filter(|(_, r)| r.visible) {
            if let Some(indices) = self.classification.water.get(key) {
                mesh::water::patch_uvs(&self.rects, key.set_number, indices, phase, &mut rec.geometry);
            }
        }
        self.built_phase = phase;
        log::trace!("tile uv patch at phase {phase:?}");
    }

    fn sync_materials(&mut self) {
        let variant = MaterialVariant::select(self.shadows.is_active());
        if let Some(rec) = self.unified.as_mut() {
            let spec = MaterialSpec::tiles(&self.cfg, self.ctx, variant, rec.geometry.max_draw_z);
            rec.sync_material(spec);
        }
        for rec in self.water_meshes.values_mut() {
            rec.sync_material(MaterialSpec::water(&self.cfg, variant));
        }
        if let Some(rec) = self.shadow.as_mut() {
            rec.sync_material(MaterialSpec::shadow(&self.cfg));
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn config(&self) -> &TileConfig {
        &self.cfg
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    pub fn rects(&self) -> &RectAccumulator {
        &self.rects
    }

    pub fn bitmaps(&self) -> &[Bitmap] {
        &self.bitmaps
    }

    pub fn layers(&self) -> &LayerTracker {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut LayerTracker {
        &mut self.layers
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn unified(&self) -> Option<&MeshRecord<TileGeometry>> {
        self.unified.as_ref()
    }

    pub(crate) fn unified_mut(&mut self) -> Option<&mut MeshRecord<TileGeometry>> {
        self.unified.as_mut()
    }

    pub fn shadow(&self) -> Option<&MeshRecord<ShadowGeometry>> {
        self.shadow.as_ref()
    }

    pub(crate) fn shadow_mut(&mut self) -> Option<&mut MeshRecord<ShadowGeometry>> {
        self.shadow.as_mut()
    }

    pub fn water_meshes(&self) -> impl Iterator<Item = (&WaterKey, &MeshRecord<WaterGeometry>)> {
        self.water_meshes.iter()
    }

    pub(crate) fn water_meshes_mut(&mut self) -> impl Iterator<Item = (&WaterKey, &mut MeshRecord<WaterGeometry>)> {
        self.water_meshes.iter_mut()
    }

    /// The water classifier alongside mutable water meshes, for callers
    /// that compose water shaders while uploading.
    pub(crate) fn water_parts_mut(
        &mut self,
    ) -> (&dyn WaterClassifier, impl Iterator<Item = (&WaterKey, &mut MeshRecord<WaterGeometry>)>) {
        (self.water.as_ref(), self.water_meshes.iter_mut())
    }

    pub fn water_mesh(&self, key: &WaterKey) -> Option<&MeshRecord<WaterGeometry>> {
        self.water_meshes.get(key)
    }

    pub fn water_classifier(&self) -> &dyn WaterClassifier {
        self.water.as_ref()
    }

    pub fn shadow_color(&self) -> [f32; 4] {
        self.shadow_color
    }

    /// Read and reset the shadow-colour upload flag.
    pub(crate) fn take_shadow_color_dirty(&mut self) -> bool {
        std::mem::take(&mut self.shadow_color_dirty)
    }
}
