pub mod array_texture;
pub mod gpu_mesh;
pub mod materials;
pub mod pipeline;
pub mod placeholder;

use std::collections::{BTreeMap, HashMap};

use wgpu::util::DeviceExt;

use array_texture::ArrayTexture;
use gpu_mesh::GpuMesh;
use materials::{MaterialFactory, MaterialTextures};
use pipeline::MaterialParams;

use crate::batch::RectParams;
use crate::batcher::{FlushOutcome, TileBatcher};
use crate::bitmap::{Bitmap, Revision};
use crate::camera::{CameraUniform, LightUniform};
use crate::classify::WaterKey;
use crate::config::{RenderMode, TileConfig};
use crate::material::RenderContext;
use crate::shadow::ShadowSwitch;
use crate::water::WaterClassifier;

/// Full-resolution copy of one tileset, sampled by that set's water groups.
struct SourceTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    revision: Revision,
}

/// Whether an uploaded source still mirrors `bitmap`.
fn source_is_current(uploaded: Option<Revision>, bitmap: Revision) -> bool {
    uploaded == Some(bitmap)
}

/// Whether a water material must be rebuilt: its spec changed or it binds
/// another source than the one now uploaded.
fn water_material_is_stale(bound: Option<(u64, Option<Revision>)>, generation: u64, source: Revision) -> bool {
    bound.is_none_or(|(g, revision)| g != generation || revision != Some(source))
}

/// A tile layer on the GPU.
///
/// Wraps a [`TileBatcher`] and mirrors its meshes into wgpu buffers,
/// pipelines and textures.  Per frame:
///
/// 1. `clear`, then `add_rect` for every visible tile (or just
///    `set_animation_offset` when only the animation advanced),
/// 2. `flush` to build geometry and upload what changed,
/// 3. `draw` inside a render pass that has a color and a depth attachment.
pub struct TileLayer {
    batcher: TileBatcher,
    materials: MaterialFactory,
    array: ArrayTexture,
    sources: HashMap<i32, SourceTexture>,

    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    unified: Option<GpuMesh>,
    shadow: Option<GpuMesh>,
    water: BTreeMap<WaterKey, GpuMesh>,
}

impl TileLayer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        cfg: TileConfig,
        water: Box<dyn WaterClassifier>,
        shadows: ShadowSwitch,
    ) -> Self {
        let placeholder = placeholder::acquire(device, queue);
        let materials = MaterialFactory::new(device, placeholder, color_format, depth_format);
        let array = ArrayTexture::new(device, cfg.layer_size, cfg.layer_count);

        let camera = CameraUniform::overlay(cfg.layer_size as f32, cfg.layer_size as f32);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile_camera_buffer"),
            contents: bytemuck::cast_slice(&[camera]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile_light_buffer"),
            contents: bytemuck::cast_slice(&[LightUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tile_frame_bg"),
            layout: materials.frame_layout(),
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: light_buffer.as_entire_binding() },
            ],
        });

        Self {
            batcher: TileBatcher::new(cfg, water, shadows),
            materials,
            array,
            sources: HashMap::new(),
            camera_buffer,
            light_buffer,
            frame_bind_group,
            unified: None,
            shadow: None,
            water: BTreeMap::new(),
        }
    }

    // ── Forwarded mutation ───────────────────────────────────────────────────

    /// Bind new tilesets.  Every uploaded water source is released; the
    /// next flush uploads what the new bindings need.
    pub fn set_bitmaps(&mut self, bitmaps: &[Bitmap]) {
        self.batcher.set_bitmaps(bitmaps);
        for (_, source) in self.sources.drain() {
            source.texture.destroy();
        }
    }

    pub fn clear(&mut self) {
        self.batcher.clear();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_rect(&mut self, set_number: i32, u: f32, v: f32, x: f32, y: f32, w: f32, h: f32) {
        self.batcher.add_rect(set_number, u, v, x, y, w, h);
    }

    pub fn add_rect_with(&mut self, set_number: i32, params: RectParams) {
        self.batcher.add_rect_with(set_number, params);
    }

    pub fn set_draw_z(&mut self, z: u8) {
        self.batcher.set_draw_z(z);
    }

    pub fn set_animation_offset(&mut self, x: f32, y: f32) {
        self.batcher.set_animation_offset(x, y);
    }

    pub fn set_shadow_color(&mut self, rgba: [f32; 4]) {
        self.batcher.set_shadow_color(rgba);
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.batcher.set_render_mode(mode);
    }

    pub fn set_elevation(&mut self, enabled: bool) {
        self.batcher.set_elevation(enabled);
    }

    pub fn set_context(&mut self, ctx: RenderContext) {
        self.batcher.set_context(ctx);
    }

    pub fn batcher(&self) -> &TileBatcher {
        &self.batcher
    }

    // ── Per-frame uniforms ───────────────────────────────────────────────────

    pub fn update_camera(&self, queue: &wgpu::Queue, uniform: &CameraUniform) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(std::slice::from_ref(uniform)));
    }

    pub fn update_light(&self, queue: &wgpu::Queue, uniform: &LightUniform) {
        queue.write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(std::slice::from_ref(uniform)));
    }

    /// Advance the water clocks and upload the new uniforms.
    pub fn update_time(&mut self, queue: &wgpu::Queue, seconds: f32) {
        self.batcher.update_time(seconds);
        self.upload_water_uniforms(queue);
    }

    fn upload_water_uniforms(&mut self, queue: &wgpu::Queue) {
        for (key, rec) in self.batcher.water_meshes_mut() {
            if !rec.geometry.uniforms_dirty {
                continue;
            }
            let Some(buf) = self.water.get(key).and_then(|m| m.material.as_ref()).and_then(|m| m.water.as_ref()) else {
                continue;
            };
            queue.write_buffer(buf, 0, bytemuck::bytes_of(&rec.geometry.uniforms));
            rec.geometry.uniforms_dirty = false;
        }
    }

    // ── Flush ────────────────────────────────────────────────────────────────

    /// Build this frame's geometry and upload everything that changed.
    pub fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> FlushOutcome {
        let outcome = self.batcher.flush();

        if self.batcher.layers().needs_update() {
            let pending = self.batcher.layers_mut().drain();
            self.array.apply(queue, pending);
        }

        self.sync_sources(device, queue);
        self.sync_unified(device, queue);
        self.sync_shadow(device, queue);
        self.sync_water(device, queue);
        self.upload_water_uniforms(queue);
        outcome
    }

    /// Keep one full-resolution texture per tileset that has visible water.
    fn sync_sources(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        for (key, _) in self.batcher.water_meshes().filter(|(_, rec)| rec.visible) {
            let set_number = key.set_number;
            let Some(bitmap) = usize::try_from(set_number).ok().and_then(|i| self.batcher.bitmaps().get(i)) else {
                continue;
            };
            let revision = bitmap.revision();
            if source_is_current(self.sources.get(&set_number).map(|s| s.revision), revision) {
                continue;
            }
            let Some(image) = bitmap.image() else { continue };
            let (width, height) = image.dimensions();
            let texture = device.create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("tile_water_source"),
                    size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8UnormSrgb,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                image.as_raw(),
            );
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            if let Some(old) = self.sources.insert(set_number, SourceTexture { texture, view, revision }) {
                old.texture.destroy();
            }
            log::info!("water source texture for set {set_number} uploaded ({width}x{height})");
        }
    }

    fn sync_unified(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let Some(rec) = self.batcher.unified() else { return };
        let (generation, spec) = (rec.material_generation(), rec.material().copied());
        let gpu = self.unified.get_or_insert_with(GpuMesh::default);

        if let Some(spec) = spec.filter(|_| gpu.material.as_ref().map(|m| m.generation) != Some(generation)) {
            if let Some(old) = gpu.material.take() {
                old.destroy();
            }
            let textures = MaterialTextures::Array { view: &self.array.view, sampler: &self.array.sampler };
            let material = self.materials.build(
                device,
                self.batcher.water_classifier(),
                &spec,
                [1.0; 4],
                textures,
                generation,
            );
            gpu.material = Some(material);
        }
        if let Some(rec) = self.batcher.unified_mut() {
            gpu.sync_tiles(device, queue, &mut rec.geometry);
        }
    }

    fn sync_shadow(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let Some(rec) = self.batcher.shadow() else { return };
        let (generation, spec) = (rec.material_generation(), rec.material().copied());
        let color = self.batcher.shadow_color();
        let gpu = self.shadow.get_or_insert_with(GpuMesh::default);

        if let Some(spec) = spec.filter(|_| gpu.material.as_ref().map(|m| m.generation) != Some(generation)) {
            if let Some(old) = gpu.material.take() {
                old.destroy();
            }
            let material = self.materials.build(
                device,
                self.batcher.water_classifier(),
                &spec,
                color,
                MaterialTextures::Flat,
                generation,
            );
            gpu.material = Some(material);
            self.batcher.take_shadow_color_dirty();
        }
        if self.batcher.take_shadow_color_dirty() {
            if let (Some(material), Some(spec)) = (&gpu.material, spec) {
                queue.write_buffer(&material.params, 0, bytemuck::bytes_of(&MaterialParams::new(&spec, color)));
            }
        }
        if let Some(rec) = self.batcher.shadow_mut() {
            gpu.sync_shadow(device, queue, &mut rec.geometry);
        }
    }

    fn sync_water(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let (classifier, meshes) = self.batcher.water_parts_mut();

        for (key, rec) in meshes {
            if !rec.visible {
                continue;
            }
            let Some(source) = self.sources.get(&key.set_number) else { continue };
            let generation = rec.material_generation();
            let gpu = self.water.entry(*key).or_default();

            let bound = gpu.material.as_ref().map(|m| (m.generation, m.texture_revision));
            if let Some(spec) = rec.material().copied() {
                if water_material_is_stale(bound, generation, source.revision) {
                    if let Some(old) = gpu.material.take() {
                        old.destroy();
                    }
                    let textures = MaterialTextures::Water {
                        view: &source.view,
                        revision: source.revision,
                        uniforms: &rec.geometry.uniforms,
                    };
                    gpu.material = Some(self.materials.build(device, classifier, &spec, [1.0; 4], textures, generation));
                }
            }
            gpu.sync_water(device, queue, &mut rec.geometry);
        }
    }

    // ── Draw ─────────────────────────────────────────────────────────────────

    /// Record this layer's draw calls: water groups first, then the unified
    /// batch, then shadows.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for (key, gpu) in &self.water {
            if self.batcher.water_mesh(key).is_some_and(|r| r.visible) {
                gpu.draw(pass, 4);
            }
        }
        if let (Some(gpu), Some(rec)) = (&self.unified, self.batcher.unified()) {
            if rec.visible {
                gpu.draw(pass, 4);
            }
        }
        if let (Some(gpu), Some(rec)) = (&self.shadow, self.batcher.shadow()) {
            if rec.visible {
                gpu.draw(pass, 2);
            }
        }
    }

    /// Release every GPU resource owned by the layer.
    pub fn destroy(self) {
        let Self { array, unified, shadow, water, sources, camera_buffer, light_buffer, .. } = self;
        array.destroy();
        for gpu in unified.into_iter().chain(shadow).chain(water.into_values()) {
            gpu.destroy();
        }
        for source in sources.into_values() {
            source.texture.destroy();
        }
        camera_buffer.destroy();
        light_buffer.destroy();
        log::debug!("tile layer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn rebound_tileset_at_same_version_needs_a_new_source() {
        let old = Bitmap::from_image(RgbaImage::new(4, 4));
        let new = Bitmap::from_image(RgbaImage::new(8, 8));
        assert_eq!(old.version(), new.version());

        assert!(source_is_current(Some(old.revision()), old.revision()));
        assert!(!source_is_current(Some(old.revision()), new.revision()));
        assert!(!source_is_current(None, new.revision()));
    }

    #[test]
    fn water_material_follows_its_source() {
        let old = Bitmap::from_image(RgbaImage::new(4, 4));
        let new = Bitmap::from_image(RgbaImage::new(4, 4));
        let bound = Some((3, Some(old.revision())));

        assert!(!water_material_is_stale(bound, 3, old.revision()));
        assert!(water_material_is_stale(bound, 3, new.revision()));
        assert!(water_material_is_stale(bound, 4, old.revision()));
        assert!(water_material_is_stale(None, 3, old.revision()));

        old.load(RgbaImage::new(4, 4));
        assert!(water_material_is_stale(bound, 3, old.revision()));
    }
}
