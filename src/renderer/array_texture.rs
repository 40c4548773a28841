use crate::texture_array::PendingUploads;

/// The GPU half of the texture array: one `layer_size²` RGBA texture with
/// `layer_count` slices, sampled as `texture_2d_array`.
pub struct ArrayTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    layer_size: u32,
    layer_count: u32,
}

impl ArrayTexture {
    pub fn new(device: &wgpu::Device, layer_size: u32, layer_count: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile_array"),
            size: wgpu::Extent3d {
                width: layer_size,
                height: layer_size,
                depth_or_array_layers: layer_count,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("tile_array_view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            array_layer_count: Some(layer_count),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tile_array_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self { texture, view, sampler, layer_size, layer_count }
    }

    /// Apply staged work: an optional wholesale clear, then each layer copy.
    pub fn apply(&self, queue: &wgpu::Queue, pending: PendingUploads) {
        if pending.clear_all {
            let zeros = vec![0u8; (self.layer_size * self.layer_size * 4 * self.layer_count) as usize];
            self.write(queue, 0, self.layer_count, &zeros);
        }
        for upload in &pending.layers {
            if upload.layer >= self.layer_count {
                continue;
            }
            self.write(queue, upload.layer, 1, upload.pixels.as_raw());
        }
    }

    fn write(&self, queue: &wgpu::Queue, first_layer: u32, layers: u32, data: &[u8]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: first_layer },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.layer_size),
                rows_per_image: Some(self.layer_size),
            },
            wgpu::Extent3d {
                width: self.layer_size,
                height: self.layer_size,
                depth_or_array_layers: layers,
            },
        );
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}
