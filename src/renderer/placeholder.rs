// ── Shared placeholder texture ────────────────────────────────────────────────
//
// A 1×1 opaque white texture bound as the `base_map` of every tile and
// water material.  It is never sampled; it only fills the slot.  One
// instance is shared by every layer in the process.  The first `acquire`
// creates it on the caller's device; `teardown` drops the shared reference
// (layers still holding a clone keep theirs alive until they are destroyed)
// and must be called before switching to another device.

use std::sync::{Arc, Mutex, PoisonError};

use wgpu::util::DeviceExt;

pub const PLACEHOLDER_PIXEL: [u8; 4] = [255, 255, 255, 255];

#[derive(Debug)]
pub struct Placeholder {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

static SHARED: Mutex<Option<Arc<Placeholder>>> = Mutex::new(None);

/// Get the shared placeholder, creating it on first use.
pub fn acquire(device: &wgpu::Device, queue: &wgpu::Queue) -> Arc<Placeholder> {
    let mut slot = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = slot.as_ref() {
        return Arc::clone(existing);
    }

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("tile_placeholder"),
            size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &PLACEHOLDER_PIXEL,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let placeholder = Arc::new(Placeholder { texture, view });
    *slot = Some(Arc::clone(&placeholder));
    log::debug!("placeholder texture created");
    placeholder
}

/// Drop the process-wide reference.  The GPU texture is released once the
/// last layer holding it is destroyed.
pub fn teardown() {
    let mut slot = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.take().is_some() {
        log::debug!("placeholder texture released");
    }
}

impl Drop for Placeholder {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}
