use wgpu::util::DeviceExt;

use crate::bitmap::Revision;
use crate::mesh::{Attribute, ShadowGeometry, TileGeometry, WaterGeometry};

// ── GpuAttribute ──────────────────────────────────────────────────────────────

/// Vertex buffer mirroring one [`Attribute`].
#[derive(Default)]
pub struct GpuAttribute {
    buffer: Option<wgpu::Buffer>,
}

impl GpuAttribute {
    /// Upload `attr` if flagged.  Same-size data is written into the existing
    /// buffer; a size change replaces the buffer.
    pub fn sync<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        attr: &mut Attribute<T>,
    ) {
        if !attr.take_dirty() || attr.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(attr.as_slice());
        match &self.buffer {
            Some(buf) if buf.size() == bytes.len() as u64 => queue.write_buffer(buf, 0, bytes),
            _ => {
                if let Some(old) = self.buffer.take() {
                    old.destroy();
                }
                self.buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytes,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                }));
            }
        }
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    pub fn destroy(&mut self) {
        if let Some(buf) = self.buffer.take() {
            buf.destroy();
        }
    }
}

// ── GpuMaterial ───────────────────────────────────────────────────────────────

pub struct GpuMaterial {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
    pub params: wgpu::Buffer,
    /// Water groups only.
    pub water: Option<wgpu::Buffer>,
    /// `MeshRecord::material_generation` this material was built for.
    pub generation: u64,
    /// Source bitmap bound into `bind_group` (water groups only).
    pub texture_revision: Option<Revision>,
}

impl GpuMaterial {
    pub fn destroy(self) {
        self.params.destroy();
        if let Some(water) = self.water {
            water.destroy();
        }
    }
}

// ── GpuMesh ───────────────────────────────────────────────────────────────────

/// GPU buffers and material of one mesh record.  Slot order follows
/// `pipeline::vertex_layouts`.
#[derive(Default)]
pub struct GpuMesh {
    pub streams: [GpuAttribute; 4],
    pub material: Option<GpuMaterial>,
    pub vertex_count: u32,
}

impl GpuMesh {
    pub fn sync_tiles(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, geom: &mut TileGeometry) {
        let [pos, normal, uv, layer] = &mut self.streams;
        pos.sync(device, queue, "tile_positions", &mut geom.positions);
        normal.sync(device, queue, "tile_normals", &mut geom.normals);
        uv.sync(device, queue, "tile_uvs", &mut geom.uvs);
        layer.sync(device, queue, "tile_layers", &mut geom.layers);
        self.vertex_count = geom.vertex_count() as u32;
    }

    pub fn sync_water(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, geom: &mut WaterGeometry) {
        let [pos, normal, uv, bounds] = &mut self.streams;
        pos.sync(device, queue, "water_positions", &mut geom.positions);
        normal.sync(device, queue, "water_normals", &mut geom.normals);
        uv.sync(device, queue, "water_uvs", &mut geom.uvs);
        bounds.sync(device, queue, "water_bounds", &mut geom.bounds);
        self.vertex_count = geom.vertex_count() as u32;
    }

    pub fn sync_shadow(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, geom: &mut ShadowGeometry) {
        let [pos, normal, ..] = &mut self.streams;
        pos.sync(device, queue, "shadow_positions", &mut geom.positions);
        normal.sync(device, queue, "shadow_normals", &mut geom.normals);
        self.vertex_count = geom.vertex_count() as u32;
    }

    /// Bind pipeline, material group and vertex streams, then draw.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, stream_count: usize) {
        let Some(material) = &self.material else { return };
        if self.vertex_count == 0 {
            return;
        }
        pass.set_pipeline(&material.pipeline);
        pass.set_bind_group(1, &material.bind_group, &[]);
        for (slot, stream) in self.streams.iter().take(stream_count).enumerate() {
            let Some(buf) = stream.buffer() else { return };
            pass.set_vertex_buffer(slot as u32, buf.slice(..));
        }
        pass.draw(0..self.vertex_count, 0..1);
    }

    pub fn destroy(mut self) {
        for stream in &mut self.streams {
            stream.destroy();
        }
        if let Some(material) = self.material.take() {
            material.destroy();
        }
    }
}
