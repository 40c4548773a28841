// ── Texture array bookkeeping (pure, GPU-free) ────────────────────────────────
//
// Decides which array layers need new pixels.  Each slot remembers whether
// it holds an image and which source revision it was copied from; a scan
// compares those against the bound bitmaps and stages a rasterized copy for
// every layer that is new or changed.  The GPU side
// (`renderer::array_texture`) drains the staged uploads.

use image::{Rgba, RgbaImage};

use crate::bitmap::{Bitmap, Revision};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LayerSlot {
    loaded: bool,
    revision: Revision,
}

/// A rasterized layer waiting to be copied into its depth slice.
#[derive(Debug)]
pub struct LayerUpload {
    pub layer: u32,
    /// Exactly `layer_size × layer_size` pixels.
    pub pixels: RgbaImage,
}

/// Everything the GPU texture must apply since the last drain.
#[derive(Debug, Default)]
pub struct PendingUploads {
    /// Zero the whole backing store before copying `layers`.
    pub clear_all: bool,
    pub layers: Vec<LayerUpload>,
}

#[derive(Debug)]
pub struct LayerTracker {
    layer_size: u32,
    slots: Vec<LayerSlot>,
    staged: Vec<LayerUpload>,
    clear_all: bool,
    needs_update: bool,
    copies: u64,
}

impl LayerTracker {
    pub fn new(layer_size: u32, layer_count: u32) -> Self {
        Self {
            layer_size,
            slots: vec![LayerSlot::default(); layer_count as usize],
            staged: Vec::new(),
            clear_all: false,
            needs_update: false,
            copies: 0,
        }
    }

    pub fn layer_size(&self) -> u32 {
        self.layer_size
    }

    pub fn layer_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Forget every loaded layer and schedule a wholesale clear.  Called
    /// when the tileset binding changes.
    pub fn invalidate(&mut self) {
        self.slots.fill(LayerSlot::default());
        self.staged.clear();
        self.clear_all = true;
        self.needs_update = true;
    }

    /// Compare `bitmaps` against the slots and stage a copy for every layer
    /// whose source is ready and unseen or changed.  Returns the number of
    /// copies made.  Unready sources are skipped and retried next scan.
    pub fn scan(&mut self, bitmaps: &[Bitmap]) -> usize {
        let mut copied = 0;
        for (layer, (slot, bitmap)) in self.slots.iter_mut().zip(bitmaps).enumerate() {
            let Some(image) = bitmap.image() else { continue };
            let revision = bitmap.revision();
            if slot.loaded && slot.revision == revision {
                continue;
            }

            let pixels = rasterize(&image, self.layer_size);
            let layer = layer as u32;
            self.staged.retain(|u| u.layer != layer);
            self.staged.push(LayerUpload { layer, pixels });

            *slot = LayerSlot { loaded: true, revision };
            self.needs_update = true;
            copied += 1;
        }
        self.copies += copied as u64;
        if copied > 0 {
            log::info!("texture array: staged {copied} layer(s)");
        }
        copied
    }

    /// Whether the backing texture has changes waiting for upload.
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Whether a wholesale clear is waiting for the next drain.
    pub fn clear_pending(&self) -> bool {
        self.clear_all
    }

    pub fn is_loaded(&self, layer: u32) -> bool {
        self.slots.get(layer as usize).is_some_and(|s| s.loaded)
    }

    /// Total layer copies performed over the tracker's lifetime.
    pub fn copy_count(&self) -> u64 {
        self.copies
    }

    /// Take the staged work and mark the texture clean.
    pub fn drain(&mut self) -> PendingUploads {
        self.needs_update = false;
        PendingUploads {
            clear_all: std::mem::take(&mut self.clear_all),
            layers: std::mem::take(&mut self.staged),
        }
    }
}

/// Draw `src` into a transparent `size × size` canvas anchored at the top-left
/// corner.  Larger sources are cropped; smaller ones leave the remainder
/// transparent.  No scaling, so pixel UVs stay valid.
pub fn rasterize(src: &RgbaImage, size: u32) -> RgbaImage {
    if src.dimensions() == (size, size) {
        return src.clone();
    }
    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    image::imageops::replace(&mut canvas, src, 0, 0);
    canvas
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(c))
    }

    #[test]
    fn rasterize_pads_small_sources_with_transparency() {
        let out = rasterize(&solid(2, 2, [255, 0, 0, 255]), 4);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(2, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn rasterize_crops_large_sources() {
        let out = rasterize(&solid(8, 8, [0, 255, 0, 255]), 4);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(3, 3).0, [0, 255, 0, 255]);
    }

    #[test]
    fn bitmaps_beyond_layer_count_are_ignored() {
        let mut t = LayerTracker::new(4, 2);
        let bitmaps: Vec<Bitmap> = (0..3).map(|_| Bitmap::from_image(solid(4, 4, [1, 1, 1, 1]))).collect();
        assert_eq!(t.scan(&bitmaps), 2);
        assert!(!t.is_loaded(2));
    }

    #[test]
    fn restaging_a_layer_replaces_the_older_copy() {
        let mut t = LayerTracker::new(4, 1);
        let b = Bitmap::from_image(solid(4, 4, [1, 1, 1, 1]));
        t.scan(std::slice::from_ref(&b));
        b.load(solid(4, 4, [9, 9, 9, 9]));
        t.scan(std::slice::from_ref(&b));
        let pending = t.drain();
        assert_eq!(pending.layers.len(), 1);
        assert_eq!(pending.layers[0].pixels.get_pixel(0, 0).0, [9, 9, 9, 9]);
    }
}
